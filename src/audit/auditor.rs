//! Integrity audit over a completed mirror.
//!
//! Walks the store and sorts every media file into empty, corrupt or valid.
//! Empty and corrupt files are deleted so the next download run fetches them
//! again; nothing is repaired in place and nothing is fetched from here.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use serde::Serialize;
use walkdir::WalkDir;

use crate::audit::validator::validator_for;
use crate::error::{Error, Result};
use crate::manifest::MediaKind;
use crate::output::create_item_bar;

/// Verdict for one file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditVerdict {
    Empty,
    Corrupt,
    Valid,
}

/// Audit settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditOptions {
    /// Report verdicts without deleting anything.
    pub dry_run: bool,
    /// Show a progress bar while checking files.
    pub show_progress: bool,
}

/// Audit totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub valid: u64,
    pub empty: u64,
    pub corrupt: u64,
    /// Files whose extension has no validator; left untouched.
    pub unrecognized: u64,
    /// Files removed (or that would be removed on a dry run).
    pub removed: Vec<PathBuf>,
    /// Bad files that could not be deleted.
    pub undeleted: Vec<PathBuf>,
    pub dry_run: bool,
}

impl AuditReport {
    /// Whether every recognized file is valid.
    pub fn is_clean(&self) -> bool {
        self.empty == 0 && self.corrupt == 0
    }

    /// Total files seen.
    pub fn total(&self) -> u64 {
        self.valid + self.empty + self.corrupt + self.unrecognized
    }

    fn tally(&mut self, verdict: AuditVerdict) {
        match verdict {
            AuditVerdict::Empty => self.empty += 1,
            AuditVerdict::Corrupt => self.corrupt += 1,
            AuditVerdict::Valid => self.valid += 1,
        }
    }
}

/// Classify a single file without touching it.
///
/// Returns `None` for files the auditor has no validator for.
pub fn judge_file(path: &Path, size: u64) -> Option<AuditVerdict> {
    if size == 0 {
        return Some(AuditVerdict::Empty);
    }

    let kind = MediaKind::from_path(path)?;

    match validator_for(kind).validate(path) {
        Ok(()) => Some(AuditVerdict::Valid),
        Err(e) => {
            tracing::debug!("{}", e);
            Some(AuditVerdict::Corrupt)
        }
    }
}

/// Audit every file below `root`.
pub fn audit_store(root: &Path, options: AuditOptions) -> Result<AuditReport> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Data directory not found: {}",
            root.display()
        )));
    }

    let files = collect_files(root)?;
    tracing::info!("Auditing {} files for corruption...", files.len());

    let progress = if options.show_progress {
        create_item_bar(files.len() as u64, "Auditing")
    } else {
        ProgressBar::hidden()
    };

    let mut report = AuditReport {
        dry_run: options.dry_run,
        ..AuditReport::default()
    };

    for (path, size) in files {
        progress.inc(1);

        let verdict = match judge_file(&path, size) {
            Some(verdict) => verdict,
            None => {
                report.unrecognized += 1;
                continue;
            }
        };

        report.tally(verdict);

        if verdict != AuditVerdict::Valid {
            tracing::debug!("{:?}: {}", verdict, path.display());
            if options.dry_run {
                report.removed.push(path);
            } else {
                discard(&mut report, path);
            }
        }
    }

    progress.finish_and_clear();
    Ok(report)
}

/// Delete a bad file; a failure is logged and recorded, not fatal.
fn discard(report: &mut AuditReport, path: PathBuf) {
    match std::fs::remove_file(&path) {
        Ok(()) => report.removed.push(path),
        Err(e) => {
            tracing::warn!("{}", Error::filesystem(&path, e));
            report.undeleted.push(path);
        }
    }
}

/// Every regular file below `root` with its size, in a stable order.
fn collect_files(root: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry.metadata()?.len();
        files.push((entry.into_path(), size));
    }

    Ok(files)
}
