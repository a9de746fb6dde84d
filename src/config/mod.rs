//! Configuration module for hms-mirror.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - CLI argument parsing and merging
//! - Configuration validation

pub mod loader;
pub mod validation;

pub use loader::{BackoffConfig, Config, HttpConfig, ManifestConfig, OptionsConfig, OutputConfig};
pub use validation::validate_config;
