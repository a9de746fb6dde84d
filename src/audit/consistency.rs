//! Folder/label consistency report.
//!
//! Dataset files are named `<label>_<rest>` and stored under folders whose
//! names mention the vessel types they hold. A file whose label does not
//! appear in its folder name was probably filed in the wrong place.
//! The match is a plain substring test, so `boat` passes inside `speedboat`.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// One file whose label is missing from its folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub file: String,
    pub label: String,
    pub folder: String,
    pub path: PathBuf,
}

/// Result of a consistency pass.
#[derive(Debug, Default)]
pub struct ConsistencyReport {
    pub total_checked: u64,
    pub mismatches: Vec<Mismatch>,
}

impl ConsistencyReport {
    /// Distinct `(label, folder)` pairs in first-seen order, at most `limit`.
    pub fn unique_conflicts(&self, limit: usize) -> Vec<(&str, &str)> {
        let mut seen = HashSet::new();
        self.mismatches
            .iter()
            .filter(|m| seen.insert((m.label.as_str(), m.folder.as_str())))
            .map(|m| (m.label.as_str(), m.folder.as_str()))
            .take(limit)
            .collect()
    }

    /// Write every mismatch, one per line, to `path`.
    pub fn write_mismatches(&self, path: &Path) -> Result<()> {
        let mut content = String::new();
        for m in &self.mismatches {
            let _ = writeln!(
                content,
                "{}\tlabel={}\tfolder={}",
                m.path.display(),
                m.label,
                m.folder
            );
        }
        std::fs::write(path, content).map_err(|e| Error::filesystem(path, e))?;
        Ok(())
    }
}

/// Label of a file: its first `_`-separated token, lower-cased.
pub fn file_label(file_name: &str) -> String {
    file_name
        .split('_')
        .next()
        .unwrap_or(file_name)
        .to_lowercase()
}

/// Check every file below `root` against the name of its folder.
pub fn check_consistency(root: &Path) -> Result<ConsistencyReport> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Data directory not found: {}",
            root.display()
        )));
    }

    let mut report = ConsistencyReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file = entry.file_name().to_string_lossy().into_owned();
        let folder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        report.total_checked += 1;

        let label = file_label(&file);
        if !folder.contains(&label) {
            report.mismatches.push(Mismatch {
                file,
                label,
                folder,
                path: path.to_path_buf(),
            });
        }
    }

    Ok(report)
}
