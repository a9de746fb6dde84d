//! Configuration structures and loading logic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub backoff: BackoffConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Link manifest location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Newline-delimited file of dataset URLs.
    #[serde(default = "default_links_file")]
    pub links_file: PathBuf,
}

/// Local mirror location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory the remote hierarchy is mirrored under.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Browser user agent string sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Rate-limit and retry pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First wait after an HTTP 429, and the value restored on success.
    #[serde(default = "default_floor")]
    pub floor_seconds: u64,

    /// Upper bound for the doubling rate-limit wait.
    #[serde(default = "default_ceiling")]
    pub ceiling_seconds: u64,

    /// Lower bound of the politeness pause after each successful download.
    #[serde(default = "default_jitter_min")]
    pub jitter_min_ms: u64,

    /// Upper bound of the politeness pause after each successful download.
    #[serde(default = "default_jitter_max")]
    pub jitter_max_ms: u64,

    /// Constant wait before retrying after a connection failure.
    #[serde(default = "default_cooldown")]
    pub transport_cooldown_seconds: u64,
}

/// Run options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Number of tasks fetched concurrently (1 = sequential).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Whether to show progress bars and per-file lines.
    #[serde(default = "default_true")]
    pub show_downloads: bool,

    /// Whether to log files skipped because they already exist.
    #[serde(default)]
    pub show_skipped_downloads: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            links_file: default_links_file(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_seconds: default_floor(),
            ceiling_seconds: default_ceiling(),
            jitter_min_ms: default_jitter_min(),
            jitter_max_ms: default_jitter_max(),
            transport_cooldown_seconds: default_cooldown(),
        }
    }
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            show_downloads: true,
            show_skipped_downloads: false,
        }
    }
}

fn default_links_file() -> PathBuf {
    PathBuf::from("links.txt")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("HearMyShip_Data")
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_floor() -> u64 {
    10
}

fn default_ceiling() -> u64 {
    600
}

fn default_jitter_min() -> u64 {
    500
}

fn default_jitter_max() -> u64 {
    1500
}

fn default_cooldown() -> u64 {
    30
}

fn default_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one with `hms-mirror init`",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Constant wait applied after a transport failure.
    pub fn transport_cooldown(&self) -> Duration {
        Duration::from_secs(self.backoff.transport_cooldown_seconds)
    }
}
