//! Error types for the hms-mirror application.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Manifest errors
    #[error("Manifest line {line}: {message}")]
    ManifestParse { line: usize, message: String },

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Download errors
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Run stopped: {0}")]
    Aborted(String),

    // Integrity errors
    #[error("Integrity check failed for {}: {message}", path.display())]
    Integrity { path: PathBuf, message: String },

    #[error("Integrity issues found: {0}")]
    IntegrityIssues(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Directory walk errors
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// ENOSPC on Linux and macOS.
const STORAGE_FULL_OS_ERROR: i32 = 28;

impl Error {
    /// Wrap an IO error with the path it occurred on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should stop the whole run rather than a single task.
    ///
    /// Only permission and disk-full conditions qualify: retrying the next task
    /// would hit the same wall.
    pub fn is_unrecoverable(&self) -> bool {
        let source = match self {
            Error::Filesystem { source, .. } => source,
            Error::Io(source) => source,
            _ => return false,
        };

        source.kind() == std::io::ErrorKind::PermissionDenied
            || source.raw_os_error() == Some(STORAGE_FULL_OS_ERROR)
    }
}

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const INTEGRITY_ISSUES: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_permission_denied_is_unrecoverable() {
        let err = Error::filesystem(
            "/data/a.wav",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_unrecoverable());
    }

    #[test]
    fn test_disk_full_is_unrecoverable() {
        let err = Error::Io(io::Error::from_raw_os_error(STORAGE_FULL_OS_ERROR));
        assert!(err.is_unrecoverable());
    }

    #[test]
    fn test_other_errors_are_task_local() {
        let err = Error::filesystem("/data/a.wav", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_unrecoverable());
        assert!(!Error::Download("boom".into()).is_unrecoverable());
    }
}
