//! Manifest parsing: raw link lines into fetch tasks.

use std::path::Path;

use url::Url;

use crate::error::{Error, Result};
use crate::fs::naming::sanitize_filename;
use crate::manifest::task::{FetchTask, MediaKind};

/// Query parameter carrying the remote file name.
const FILE_NAME_PARAM: &str = "fileName";

/// Query parameter carrying the remote file path.
const PATH_PARAM: &str = "path";

/// Why a manifest line produced no task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The line is not a URL.
    InvalidUrl(String),
    /// The URL has no `fileName` parameter.
    MissingFileName,
    /// The `fileName` parameter is not a plain file name.
    UnsafeFileName(String),
}

/// A manifest line that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the manifest.
    pub line: usize,
    pub reason: SkipReason,
}

impl SkippedLine {
    /// Convert into the crate error type for reporting.
    pub fn to_error(&self) -> Error {
        let message = match &self.reason {
            SkipReason::InvalidUrl(e) => format!("not a URL ({})", e),
            SkipReason::MissingFileName => format!("missing '{}' parameter", FILE_NAME_PARAM),
            SkipReason::UnsafeFileName(e) => e.clone(),
        };
        Error::ManifestParse {
            line: self.line,
            message,
        }
    }
}

/// Result of resolving a manifest.
#[derive(Debug, Default)]
pub struct ResolvedManifest {
    /// Tasks in manifest order.
    pub tasks: Vec<FetchTask>,

    /// Lines that could not be turned into a task.
    pub skipped: Vec<SkippedLine>,

    /// Well-formed lines whose extension is not a recognized media type.
    pub excluded: usize,
}

/// Read and resolve a manifest file.
pub fn read_manifest(path: &Path) -> Result<ResolvedManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Config(format!("Links file not found: {}", path.display()))
        } else {
            Error::Io(e)
        }
    })?;

    Ok(resolve_manifest(&content))
}

/// Resolve raw manifest content into fetch tasks.
pub fn resolve_manifest(content: &str) -> ResolvedManifest {
    let mut resolved = ResolvedManifest::default();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(Some(task)) => resolved.tasks.push(task),
            Ok(None) => resolved.excluded += 1,
            Err(reason) => {
                let skipped = SkippedLine {
                    line: index + 1,
                    reason,
                };
                tracing::debug!("Skipping {}", skipped.to_error());
                resolved.skipped.push(skipped);
            }
        }
    }

    resolved
}

/// Parse one non-empty manifest line.
///
/// Returns `Ok(None)` for well-formed entries that are not recognized media.
fn parse_line(line: &str) -> std::result::Result<Option<FetchTask>, SkipReason> {
    let url = Url::parse(line).map_err(|e| SkipReason::InvalidUrl(e.to_string()))?;

    let mut file_name = None;
    let mut remote_path = None;

    // First occurrence wins, like a single-valued query lookup
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            FILE_NAME_PARAM if file_name.is_none() => file_name = Some(value.into_owned()),
            PATH_PARAM if remote_path.is_none() => remote_path = Some(value.into_owned()),
            _ => {}
        }
    }

    let file_name = file_name.ok_or(SkipReason::MissingFileName)?;

    let kind = match MediaKind::from_file_name(&file_name) {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let file_name =
        sanitize_filename(&file_name).map_err(|e| SkipReason::UnsafeFileName(e.to_string()))?;

    Ok(Some(FetchTask {
        source_url: line.to_string(),
        remote_path: remote_path.unwrap_or_default(),
        file_name,
        kind,
    }))
}
