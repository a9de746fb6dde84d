//! Shared rate-limit backoff.
//!
//! The remote server enforces one global rate limit, so a single
//! [`BackoffController`] is shared by every fetch in a run: a 429 anywhere
//! slows the whole batch down, a success anywhere restores normal pacing.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;

use crate::config::BackoffConfig;

/// Something that can wait.
///
/// Production code sleeps on the tokio timer; tests record the requested
/// durations and return immediately.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Adaptive delay shared across all fetch attempts.
pub struct BackoffController<'s> {
    current_delay: Mutex<Duration>,
    floor: Duration,
    ceiling: Duration,
    jitter_ms: RangeInclusive<u64>,
    sleeper: &'s dyn Sleeper,
}

impl<'s> BackoffController<'s> {
    /// Create a controller starting at `floor`.
    pub fn new(
        floor: Duration,
        ceiling: Duration,
        jitter_ms: RangeInclusive<u64>,
        sleeper: &'s dyn Sleeper,
    ) -> Self {
        Self {
            current_delay: Mutex::new(floor),
            floor,
            ceiling: ceiling.max(floor),
            jitter_ms,
            sleeper,
        }
    }

    /// Create a controller from the `[backoff]` config section.
    pub fn from_config(config: &BackoffConfig, sleeper: &'s dyn Sleeper) -> Self {
        Self::new(
            Duration::from_secs(config.floor_seconds),
            Duration::from_secs(config.ceiling_seconds),
            config.jitter_min_ms..=config.jitter_max_ms,
            sleeper,
        )
    }

    /// Delay the next rate-limit signal will wait.
    pub async fn current_delay(&self) -> Duration {
        *self.current_delay.lock().await
    }

    /// Block while another worker is waiting out a rate limit.
    pub async fn wait_ready(&self) {
        drop(self.current_delay.lock().await);
    }

    /// Wait the current delay, then double it (capped at the ceiling).
    ///
    /// The lock is held for the whole wait so every worker calling
    /// [`wait_ready`](Self::wait_ready) pauses with us.
    pub async fn on_rate_limited(&self) -> Duration {
        let mut delay = self.current_delay.lock().await;
        let waited = *delay;

        tracing::warn!("Rate limited, waiting {}s", waited.as_secs());
        self.sleeper.sleep(waited).await;

        *delay = (waited * 2).min(self.ceiling);
        waited
    }

    /// Reset the delay to the floor, then pause for a random politeness jitter.
    pub async fn on_success(&self) -> Duration {
        *self.current_delay.lock().await = self.floor;

        let jitter = Duration::from_millis(rand::thread_rng().gen_range(self.jitter_ms.clone()));
        self.sleeper.sleep(jitter).await;
        jitter
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Sleeper that records every requested duration without waiting.
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        slept: StdMutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub(crate) fn slept(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[tokio::test]
    async fn test_rate_limit_sequence_doubles_and_caps() {
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 500..=1500, &sleeper);

        let mut waits = Vec::new();
        for _ in 0..9 {
            waits.push(backoff.on_rate_limited().await);
        }

        let expected: Vec<_> = [10, 20, 40, 80, 160, 320, 600, 600, 600]
            .into_iter()
            .map(secs)
            .collect();
        assert_eq!(waits, expected);
        assert_eq!(sleeper.slept(), expected);
    }

    #[tokio::test]
    async fn test_success_resets_to_floor() {
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 500..=1500, &sleeper);

        backoff.on_rate_limited().await;
        backoff.on_rate_limited().await;
        assert_eq!(backoff.current_delay().await, secs(40));

        backoff.on_success().await;
        assert_eq!(backoff.current_delay().await, secs(10));
        assert_eq!(backoff.on_rate_limited().await, secs(10));
    }

    #[tokio::test]
    async fn test_success_sleeps_jitter_in_range() {
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 500..=1500, &sleeper);

        for _ in 0..50 {
            let jitter = backoff.on_success().await;
            assert!(jitter >= Duration::from_millis(500));
            assert!(jitter <= Duration::from_millis(1500));
        }
        assert_eq!(sleeper.slept().len(), 50);
    }

    #[tokio::test]
    async fn test_ceiling_below_floor_is_clamped() {
        let sleeper = RecordingSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(5), 0..=0, &sleeper);

        assert_eq!(backoff.on_rate_limited().await, secs(10));
        assert_eq!(backoff.on_rate_limited().await, secs(10));
    }

    #[tokio::test]
    async fn test_from_config() {
        let sleeper = RecordingSleeper::default();
        let config = BackoffConfig {
            floor_seconds: 3,
            ceiling_seconds: 7,
            ..BackoffConfig::default()
        };
        let backoff = BackoffController::from_config(&config, &sleeper);

        assert_eq!(backoff.on_rate_limited().await, secs(3));
        assert_eq!(backoff.on_rate_limited().await, secs(6));
        assert_eq!(backoff.on_rate_limited().await, secs(7));
    }

    /// Sleeper whose waits last until [`GatedSleeper::release`] is called.
    #[derive(Default)]
    struct GatedSleeper {
        gate: tokio::sync::Notify,
    }

    impl GatedSleeper {
        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl Sleeper for GatedSleeper {
        async fn sleep(&self, _duration: Duration) {
            self.gate.notified().await;
        }
    }

    #[tokio::test]
    async fn test_rate_limit_wait_holds_other_workers() {
        let sleeper = GatedSleeper::default();
        let backoff = BackoffController::new(secs(10), secs(600), 0..=0, &sleeper);
        let events = StdMutex::new(Vec::new());

        let limited = async {
            backoff.on_rate_limited().await;
            events.lock().unwrap().push("backoff finished");
        };
        let other_worker = async {
            tokio::task::yield_now().await;
            backoff.wait_ready().await;
            events.lock().unwrap().push("worker resumed");
            backoff.current_delay().await
        };
        let release = async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            events.lock().unwrap().push("released");
            sleeper.release();
        };

        let ((), delay_seen, ()) = tokio::join!(limited, other_worker, release);

        assert_eq!(
            events.into_inner().unwrap(),
            vec!["released", "backoff finished", "worker resumed"]
        );
        assert_eq!(delay_seen, secs(20));
    }
}
