//! Manifest-versus-disk completeness check.

use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::manifest::FetchTask;

/// Expected and actual file names, compared by name only.
#[derive(Debug, Default)]
pub struct CompletenessReport {
    pub expected: usize,
    pub actual: usize,
    /// Expected names not found anywhere in the store, sorted.
    pub missing: Vec<String>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compare the task list against the file names present below `root`.
pub fn check_completeness(tasks: &[FetchTask], root: &Path) -> Result<CompletenessReport> {
    let expected: BTreeSet<&str> = tasks.iter().map(|t| t.file_name.as_str()).collect();

    let mut actual = BTreeSet::new();
    if root.is_dir() {
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                actual.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    } else if root.exists() {
        return Err(Error::Config(format!(
            "Data path is not a directory: {}",
            root.display()
        )));
    }

    let missing = expected
        .iter()
        .filter(|name| !actual.contains(**name))
        .map(|name| name.to_string())
        .collect();

    Ok(CompletenessReport {
        expected: expected.len(),
        actual: actual.len(),
        missing,
    })
}
