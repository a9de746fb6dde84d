//! Filesystem module.
//!
//! Provides:
//! - The local store (task to path mapping, satisfied check, directory creation)
//! - File and directory name sanitization

pub mod naming;
pub mod paths;

pub use naming::{sanitize_filename, sanitize_path_component, sanitize_relative_dir};
pub use paths::{ensure_dir, LocalStore};
