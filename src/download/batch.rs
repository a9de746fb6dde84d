//! Batch orchestration: drives every task to a terminal state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::download::backoff::{BackoffController, Sleeper};
use crate::download::fetch::{FetchOutcome, Fetcher};
use crate::download::state::{next_step, BatchReport, Step, TaskRun, TaskState};
use crate::error::{Error, Result};
use crate::fs::LocalStore;
use crate::manifest::FetchTask;
use crate::output::create_item_bar;

/// Knobs for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Tasks in flight at once; 1 processes the manifest strictly in order.
    pub workers: usize,
    /// Constant wait after a transport error.
    pub transport_cooldown: Duration,
    /// Show the progress bar and a line per downloaded file.
    pub show_downloads: bool,
    /// Log files skipped because they already exist.
    pub show_skipped: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            transport_cooldown: Duration::from_secs(30),
            show_downloads: false,
            show_skipped: false,
        }
    }
}

impl BatchOptions {
    /// Build from the `[backoff]` and `[options]` config sections.
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.options.workers.max(1),
            transport_cooldown: config.transport_cooldown(),
            show_downloads: config.options.show_downloads,
            show_skipped: config.options.show_skipped_downloads,
        }
    }
}

/// Runs a task list through the local store and fetch engine.
pub struct BatchRunner<'a> {
    store: &'a LocalStore,
    fetcher: &'a dyn Fetcher,
    backoff: &'a BackoffController<'a>,
    sleeper: &'a dyn Sleeper,
    options: BatchOptions,
    path_locks: StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        store: &'a LocalStore,
        fetcher: &'a dyn Fetcher,
        backoff: &'a BackoffController<'a>,
        sleeper: &'a dyn Sleeper,
        options: BatchOptions,
    ) -> Self {
        Self {
            store,
            fetcher,
            backoff,
            sleeper,
            options,
            path_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Process every task until it is done, skipped, abandoned or failed.
    ///
    /// Only an unrecoverable filesystem error (permission denied, disk full)
    /// stops the run early; it is recorded in [`BatchReport::aborted`].
    pub async fn run(&self, tasks: &[FetchTask]) -> BatchReport {
        let mut report = BatchReport::new(tasks.len());

        let progress = if self.options.show_downloads {
            create_item_bar(tasks.len() as u64, "Overall Progress")
        } else {
            ProgressBar::hidden()
        };

        let mut results = stream::iter(tasks)
            .map(|task| async move { (task, self.run_task(task).await) })
            .buffer_unordered(self.options.workers.max(1));

        while let Some((task, result)) = results.next().await {
            progress.inc(1);

            match result {
                Ok(run) => {
                    debug_assert!(run.state.is_terminal());
                    report.record(task, &run)
                }
                Err(e) => {
                    tracing::error!("Stopping run at {}: {}", task.file_name, e);
                    report.record_failure(task, &e);
                    report.aborted = Some(e.to_string());
                    break;
                }
            }
        }

        progress.finish_and_clear();
        report.finish();
        report
    }

    /// Drive one task to a terminal state.
    ///
    /// Task-local errors end in [`TaskState::Failed`]; only unrecoverable
    /// ones are returned as `Err`.
    async fn run_task(&self, task: &FetchTask) -> Result<TaskRun> {
        let mut run = TaskRun::default();

        let path = match self.store.resolve(task) {
            Ok(path) => path,
            Err(e) => return self.fail(task, run, e),
        };

        // Tasks sharing a local path must not check, create or write concurrently
        let lock = self.path_lock(&path);
        let result = {
            let _guard = lock.lock().await;
            self.drive(task, &path, &mut run).await
        };
        self.release_path_lock(&path, lock);

        match result {
            Ok(()) => Ok(run),
            Err(e) => self.fail(task, run, e),
        }
    }

    async fn drive(&self, task: &FetchTask, path: &Path, run: &mut TaskRun) -> Result<()> {
        if self.store.is_satisfied(path) {
            if self.options.show_skipped {
                tracing::info!("Skipping existing file: {}", path.display());
            }
            self.transition(task, run, TaskState::Skipped);
            return Ok(());
        }

        self.store.ensure_directory(path).await?;

        loop {
            self.backoff.wait_ready().await;

            run.attempts += 1;
            let attempt = run.attempts;
            self.transition(task, run, TaskState::Fetching { attempt });

            let outcome = self.fetcher.attempt(task, path).await?;
            tracing::debug!("{}: {}", task.file_name, outcome);

            if let FetchOutcome::Success { bytes } = outcome {
                run.bytes = bytes;
            }

            match next_step(&outcome) {
                Step::Finish(state) => {
                    match &state {
                        TaskState::Done => {
                            if self.options.show_downloads {
                                tracing::info!("Downloaded: {}", path.display());
                            }
                            self.backoff.on_success().await;
                        }
                        TaskState::Abandoned(code) => {
                            tracing::warn!(
                                "Server returned {} for {}. Skipping.",
                                code,
                                task.file_name
                            );
                        }
                        _ => {}
                    }
                    self.transition(task, run, state);
                    return Ok(());
                }
                Step::RetryAfterBackoff => {
                    run.rate_limited += 1;
                    self.backoff.on_rate_limited().await;
                }
                Step::RetryAfterCooldown => {
                    run.transport_errors += 1;
                    tracing::warn!(
                        "Connection error for {}: {}. Retrying in {}s...",
                        task.file_name,
                        outcome,
                        self.options.transport_cooldown.as_secs()
                    );
                    self.sleeper.sleep(self.options.transport_cooldown).await;
                }
            }
        }
    }

    fn fail(&self, task: &FetchTask, mut run: TaskRun, error: Error) -> Result<TaskRun> {
        if error.is_unrecoverable() {
            return Err(error);
        }
        tracing::error!("Failed {}: {}", task.file_name, error);
        self.transition(task, &mut run, TaskState::Failed(error.to_string()));
        Ok(run)
    }

    fn transition(&self, task: &FetchTask, run: &mut TaskRun, next: TaskState) {
        tracing::debug!("{}: {} -> {}", task.file_name, run.state, next);
        run.state = next;
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self
            .path_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Forget the lock for `path` once no other task holds or awaits it.
    fn release_path_lock(&self, path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .path_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::backoff::tests::RecordingSleeper;
    use crate::manifest::MediaKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Fetcher replaying a scripted outcome sequence per URL.
    ///
    /// An exhausted script answers `Success`. Successes write a small file.
    #[derive(Default)]
    struct ScriptedFetcher {
        scripts: StdMutex<HashMap<String, VecDeque<FetchOutcome>>>,
        calls: StdMutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn script(self, url: &str, outcomes: Vec<FetchOutcome>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_string(), outcomes.into());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn attempt(&self, task: &FetchTask, destination: &Path) -> Result<FetchOutcome> {
            self.calls.lock().unwrap().push(task.source_url.clone());

            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&task.source_url)
                .and_then(|q| q.pop_front())
                .unwrap_or(FetchOutcome::Success { bytes: 4 });

            if let FetchOutcome::Success { .. } = next {
                std::fs::write(destination, b"data").map_err(|e| Error::filesystem(destination, e))?;
            }
            Ok(next)
        }
    }

    fn task(name: &str) -> FetchTask {
        FetchTask {
            source_url: format!("https://example.org/dl?fileName={}", name),
            remote_path: format!("/Data/Tug/{}", name),
            file_name: name.to_string(),
            kind: MediaKind::Wav,
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    async fn run_batch(
        store: &LocalStore,
        fetcher: &ScriptedFetcher,
        sleeper: &RecordingSleeper,
        tasks: &[FetchTask],
    ) -> BatchReport {
        let backoff = BackoffController::new(secs(10), secs(600), 0..=0, sleeper);
        let runner = BatchRunner::new(store, fetcher, &backoff, sleeper, BatchOptions::default());
        runner.run(tasks).await
    }

    #[tokio::test]
    async fn test_downloads_all_tasks_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let fetcher = ScriptedFetcher::default();
        let sleeper = RecordingSleeper::default();
        let tasks = vec![task("a.wav"), task("b.wav"), task("c.wav")];

        let report = run_batch(&store, &fetcher, &sleeper, &tasks).await;

        assert_eq!(report.downloaded, 3);
        assert!(report.is_complete());
        let urls: Vec<_> = tasks.iter().map(|t| t.source_url.clone()).collect();
        assert_eq!(fetcher.calls(), urls);
        assert!(dir.path().join("Data/Tug/b.wav").is_file());
    }

    #[tokio::test]
    async fn test_second_run_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let tasks = vec![task("a.wav"), task("b.wav")];

        let first = ScriptedFetcher::default();
        run_batch(&store, &first, &sleeper, &tasks).await;
        assert_eq!(first.calls().len(), 2);

        let second = ScriptedFetcher::default();
        let report = run_batch(&store, &second, &sleeper, &tasks).await;

        assert!(second.calls().is_empty());
        assert_eq!(report.skipped, 2);
        assert_eq!(report.downloaded, 0);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_empty_file_is_fetched_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let tasks = vec![task("a.wav")];

        let path = store.resolve(&tasks[0]).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        let fetcher = ScriptedFetcher::default();
        let report = run_batch(&store, &fetcher, &sleeper, &tasks).await;

        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(report.downloaded, 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried_and_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let tasks = vec![task("missing.wav"), task("ok.wav")];
        let fetcher = ScriptedFetcher::default()
            .script(&tasks[0].source_url, vec![FetchOutcome::ServerRejected(404)]);

        let report = run_batch(&store, &fetcher, &sleeper, &tasks).await;

        let calls = fetcher.calls();
        assert_eq!(calls.iter().filter(|u| **u == tasks[0].source_url).count(), 1);
        assert_eq!(calls.last(), Some(&tasks[1].source_url));
        assert_eq!(report.abandoned.len(), 1);
        assert_eq!(report.abandoned[0].status, 404);
        assert_eq!(report.downloaded, 1);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_rate_limit_escalates_then_resets() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let tasks = vec![task("a.wav"), task("b.wav")];
        let fetcher = ScriptedFetcher::default()
            .script(
                &tasks[0].source_url,
                vec![
                    FetchOutcome::RateLimited,
                    FetchOutcome::RateLimited,
                    FetchOutcome::RateLimited,
                ],
            )
            .script(&tasks[1].source_url, vec![FetchOutcome::RateLimited]);

        let report = run_batch(&store, &fetcher, &sleeper, &tasks).await;

        // 10, 20, 40, success jitter, reset so the next 429 waits the floor again
        assert_eq!(
            sleeper.slept(),
            vec![secs(10), secs(20), secs(40), secs(0), secs(10), secs(0)]
        );
        assert_eq!(report.rate_limited, 4);
        assert_eq!(report.attempts, 6);
        assert_eq!(report.downloaded, 2);
    }

    #[tokio::test]
    async fn test_transport_error_holds_constant_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let tasks = vec![task("a.wav")];
        let fetcher = ScriptedFetcher::default().script(
            &tasks[0].source_url,
            vec![
                FetchOutcome::TransportError("reset".into()),
                FetchOutcome::TransportError("reset".into()),
                FetchOutcome::TransportError("reset".into()),
            ],
        );

        let report = run_batch(&store, &fetcher, &sleeper, &tasks).await;

        assert_eq!(sleeper.slept(), vec![secs(30), secs(30), secs(30), secs(0)]);
        assert_eq!(report.transport_errors, 3);
        assert_eq!(report.downloaded, 1);
    }

    #[tokio::test]
    async fn test_unsafe_path_fails_only_that_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let mut bad = task("bad.wav");
        bad.remote_path = "/../../bad.wav".into();
        let tasks = vec![bad, task("good.wav")];
        let fetcher = ScriptedFetcher::default();

        let report = run_batch(&store, &fetcher, &sleeper, &tasks).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file_name, "bad.wav");
        assert_eq!(report.downloaded, 1);
        assert!(report.aborted.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_workers_share_paths_safely() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        // Same local path twice: the second must see the first's file
        let tasks = vec![task("a.wav"), task("a.wav"), task("b.wav"), task("c.wav")];
        let fetcher = ScriptedFetcher::default();
        let backoff = BackoffController::new(secs(10), secs(600), 0..=0, &sleeper);
        let options = BatchOptions {
            workers: 4,
            ..BatchOptions::default()
        };

        let runner = BatchRunner::new(&store, &fetcher, &backoff, &sleeper, options);
        let report = runner.run(&tasks).await;

        assert_eq!(report.downloaded, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(fetcher.calls().len(), 3);
    }

    /// Fetcher that fails every attempt with a local IO error of one kind.
    struct DeniedFetcher {
        kind: std::io::ErrorKind,
        calls: StdMutex<usize>,
    }

    #[async_trait]
    impl Fetcher for DeniedFetcher {
        async fn attempt(&self, _task: &FetchTask, destination: &Path) -> Result<FetchOutcome> {
            *self.calls.lock().unwrap() += 1;
            Err(Error::filesystem(
                destination,
                std::io::Error::new(self.kind, "write refused"),
            ))
        }
    }

    #[tokio::test]
    async fn test_permission_denied_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 0..=0, &sleeper);
        let fetcher = DeniedFetcher {
            kind: std::io::ErrorKind::PermissionDenied,
            calls: StdMutex::new(0),
        };
        let tasks = vec![task("a.wav"), task("b.wav"), task("c.wav")];

        let runner = BatchRunner::new(&store, &fetcher, &backoff, &sleeper, BatchOptions::default());
        let report = runner.run(&tasks).await;

        assert_eq!(*fetcher.calls.lock().unwrap(), 1);
        assert!(report.aborted.is_some());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file_name, "a.wav");
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_other_local_errors_fail_only_their_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 0..=0, &sleeper);
        let fetcher = DeniedFetcher {
            kind: std::io::ErrorKind::NotFound,
            calls: StdMutex::new(0),
        };
        let tasks = vec![task("a.wav"), task("b.wav")];

        let runner = BatchRunner::new(&store, &fetcher, &backoff, &sleeper, BatchOptions::default());
        let report = runner.run(&tasks).await;

        assert_eq!(*fetcher.calls.lock().unwrap(), 2);
        assert!(report.aborted.is_none());
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.attempts, 2);
    }

    #[tokio::test]
    async fn test_path_locks_are_released_after_each_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 0..=0, &sleeper);
        let fetcher = ScriptedFetcher::default();
        let tasks = vec![task("a.wav"), task("a.wav"), task("b.wav"), task("c.wav")];
        let options = BatchOptions {
            workers: 3,
            ..BatchOptions::default()
        };

        let runner = BatchRunner::new(&store, &fetcher, &backoff, &sleeper, options);
        let report = runner.run(&tasks).await;

        assert_eq!(report.completed(), 4);
        assert!(runner.path_locks.lock().unwrap().is_empty());
    }
}
