//! HMS Mirror - a resumable HTTP mirror for the HearMyShip dataset
//!
//! This library turns a flat file of dataset links into a complete local copy of
//! the remote folder hierarchy, and checks the copy afterwards.
//!
//! # Features
//!
//! - Manifest resolution from `fileName`/`path` query parameters
//! - Adaptive backoff shared by every worker under HTTP 429
//! - Idempotent resume: existing non-empty files are never re-fetched
//! - Per-task failure isolation
//! - Integrity audit of WAV and JPEG files
//! - Folder/label consistency and completeness reports
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use hms_mirror::{
//!     BackoffController, BatchOptions, BatchRunner, Config, HttpFetcher, LocalStore,
//!     TokioSleeper,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("hms-mirror.toml"))?;
//!     let manifest = hms_mirror::manifest::read_manifest(&config.manifest.links_file)?;
//!
//!     let sleeper = TokioSleeper;
//!     let backoff = BackoffController::from_config(&config.backoff, &sleeper);
//!     let fetcher = HttpFetcher::from_config(&config)?;
//!     let store = LocalStore::new(config.output.directory.clone());
//!     let runner = BatchRunner::new(
//!         &store,
//!         &fetcher,
//!         &backoff,
//!         &sleeper,
//!         BatchOptions::from_config(&config),
//!     );
//!
//!     let report = runner.run(&manifest.tasks).await;
//!     println!("{} downloaded", report.downloaded);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod output;

// Re-exports for convenience
pub use audit::{audit_store, AuditOptions, AuditReport};
pub use config::Config;
pub use download::{
    BackoffController, BatchOptions, BatchReport, BatchRunner, HttpFetcher, TokioSleeper,
};
pub use error::{Error, Result};
pub use fs::LocalStore;
pub use manifest::{FetchTask, MediaKind};
