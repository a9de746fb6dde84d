//! Audit module: post-download checks over the local mirror.
//!
//! Provides:
//! - Integrity audit (empty and corrupt file removal)
//! - Per-format validators (WAV header parse, JPEG decode)
//! - Folder/label consistency report
//! - Manifest completeness check

pub mod auditor;
pub mod completeness;
pub mod consistency;
pub mod validator;

pub use auditor::{audit_store, judge_file, AuditOptions, AuditReport, AuditVerdict};
pub use completeness::{check_completeness, CompletenessReport};
pub use consistency::{check_consistency, file_label, ConsistencyReport, Mismatch};
pub use validator::{validator_for, JpegValidator, Validator, WavValidator};
