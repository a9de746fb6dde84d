//! Download module for mirroring the manifest.
//!
//! This module provides:
//! - The shared rate-limit backoff controller
//! - Single-attempt HTTP fetching
//! - Per-task state machine and batch orchestration
//! - Batch statistics and reporting

pub mod backoff;
pub mod batch;
pub mod fetch;
pub mod state;

pub use backoff::{BackoffController, Sleeper, TokioSleeper};
pub use batch::{BatchOptions, BatchRunner};
pub use fetch::{FetchOutcome, Fetcher, HttpFetcher};
pub use state::{next_step, BatchReport, Step, TaskRun, TaskState};
