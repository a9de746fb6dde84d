//! Local store: where each task lives on disk.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs::naming::{sanitize_filename, sanitize_relative_dir};
use crate::manifest::FetchTask;

/// Maps fetch tasks onto a mirror rooted at a fixed directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the mirror.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic local path for a task: `<root>/<remote dir>/<file name>`.
    pub fn resolve(&self, task: &FetchTask) -> Result<PathBuf> {
        let dir = sanitize_relative_dir(task.remote_dir())?;
        let file_name = sanitize_filename(&task.file_name)?;
        Ok(self.root.join(dir).join(file_name))
    }

    /// Whether the file at `path` already satisfies its task.
    ///
    /// Only a regular file with non-zero size counts; an empty file is a
    /// leftover from an interrupted write and must be fetched again.
    pub fn is_satisfied(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Create every missing parent directory of `path`.
    pub async fn ensure_directory(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::filesystem(parent, e))?;
        }
        Ok(())
    }
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| Error::filesystem(path, e))?;
    }
    Ok(())
}
