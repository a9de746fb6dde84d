//! Task state machine and batch statistics.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::download::fetch::FetchOutcome;
use crate::error::{Error, Result};
use crate::manifest::FetchTask;

/// Lifecycle of one task within a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    /// The local file already exists and is non-empty.
    Skipped,
    Fetching {
        attempt: u32,
    },
    Done,
    /// The server answered with a non-retryable status.
    Abandoned(u16),
    /// A local filesystem problem ended the task.
    Failed(String),
}

impl TaskState {
    /// Whether no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Skipped | TaskState::Done | TaskState::Abandoned(_) | TaskState::Failed(_)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Skipped => write!(f, "skipped"),
            TaskState::Fetching { attempt } => write!(f, "fetching (attempt {})", attempt),
            TaskState::Done => write!(f, "done"),
            TaskState::Abandoned(code) => write!(f, "abandoned (HTTP {})", code),
            TaskState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// What to do after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Leave `Fetching` for this terminal state.
    Finish(TaskState),
    /// Wait on the shared backoff, then retry.
    RetryAfterBackoff,
    /// Wait the fixed transport cool-down, then retry.
    RetryAfterCooldown,
}

/// Transition rule out of `Fetching`.
pub fn next_step(outcome: &FetchOutcome) -> Step {
    match outcome {
        FetchOutcome::Success { .. } => Step::Finish(TaskState::Done),
        FetchOutcome::RateLimited => Step::RetryAfterBackoff,
        FetchOutcome::ServerRejected(code) => Step::Finish(TaskState::Abandoned(*code)),
        FetchOutcome::TransportError(_) => Step::RetryAfterCooldown,
    }
}

/// Per-task result handed back to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub state: TaskState,
    pub attempts: u32,
    pub rate_limited: u32,
    pub transport_errors: u32,
    pub bytes: u64,
}

impl Default for TaskRun {
    fn default() -> Self {
        Self {
            state: TaskState::Pending,
            attempts: 0,
            rate_limited: 0,
            transport_errors: 0,
            bytes: 0,
        }
    }
}

/// A task the server declined.
#[derive(Debug, Clone, Serialize)]
pub struct AbandonedTask {
    pub file_name: String,
    pub source_url: String,
    pub status: u16,
}

/// A task that failed locally.
#[derive(Debug, Clone, Serialize)]
pub struct FailedTask {
    pub file_name: String,
    pub source_url: String,
    pub error: String,
}

/// Aggregate statistics for one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    pub total_tasks: usize,
    pub downloaded: u64,
    pub skipped: u64,
    pub abandoned: Vec<AbandonedTask>,
    pub failed: Vec<FailedTask>,

    pub attempts: u64,
    pub rate_limited: u64,
    pub transport_errors: u64,
    pub bytes: u64,

    /// Set when an unrecoverable filesystem error stopped the run early.
    pub aborted: Option<String>,
}

impl BatchReport {
    /// Start a report for `total_tasks` tasks.
    pub fn new(total_tasks: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            total_tasks,
            downloaded: 0,
            skipped: 0,
            abandoned: Vec::new(),
            failed: Vec::new(),
            attempts: 0,
            rate_limited: 0,
            transport_errors: 0,
            bytes: 0,
            aborted: None,
        }
    }

    /// Record the terminal state of a task.
    pub fn record(&mut self, task: &FetchTask, run: &TaskRun) {
        self.attempts += u64::from(run.attempts);
        self.rate_limited += u64::from(run.rate_limited);
        self.transport_errors += u64::from(run.transport_errors);
        self.bytes += run.bytes;

        match &run.state {
            TaskState::Done => self.downloaded += 1,
            TaskState::Skipped => self.skipped += 1,
            TaskState::Abandoned(status) => self.abandoned.push(AbandonedTask {
                file_name: task.file_name.clone(),
                source_url: task.source_url.clone(),
                status: *status,
            }),
            TaskState::Failed(reason) => self.failed.push(FailedTask {
                file_name: task.file_name.clone(),
                source_url: task.source_url.clone(),
                error: reason.clone(),
            }),
            TaskState::Pending | TaskState::Fetching { .. } => {}
        }
    }

    /// Record a task that ended in an error.
    pub fn record_failure(&mut self, task: &FetchTask, error: &Error) {
        self.failed.push(FailedTask {
            file_name: task.file_name.clone(),
            source_url: task.source_url.clone(),
            error: error.to_string(),
        });
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Tasks that reached a terminal state.
    pub fn completed(&self) -> u64 {
        self.downloaded + self.skipped + self.abandoned.len() as u64 + self.failed.len() as u64
    }

    /// Whether every task ended as downloaded or already present.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
            && self.abandoned.is_empty()
            && self.failed.is_empty()
            && self.completed() == self.total_tasks as u64
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| Error::filesystem(path, e))?;
        Ok(())
    }
}
