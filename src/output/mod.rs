//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars
//! - Report printing

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_banner, print_config_summary, print_error, print_info, print_success, print_warning,
};
pub use progress::create_item_bar;
pub use stats::{
    print_audit_report, print_batch_report, print_completeness_report, print_consistency_report,
};
