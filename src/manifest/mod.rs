//! Manifest module: link list parsing and task representation.

pub mod parser;
pub mod task;

pub use parser::{read_manifest, resolve_manifest, ResolvedManifest, SkipReason, SkippedLine};
pub use task::{FetchTask, MediaKind};
