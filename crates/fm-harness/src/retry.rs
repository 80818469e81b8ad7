use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives the events of a [`RetryPolicy::run`] call.
///
/// Callbacks are awaited inline, so an observer that records state (a log
/// entry, a retry counter) has done so before the backoff sleep starts.
#[async_trait]
pub trait RetryObserver: Send + Sync {
    /// Attempt `attempt` (0-based) of `operation` failed with `error`.
    async fn on_failure(&self, operation: &str, attempt: u32, error: &str);

    /// Retry number `attempt` (1-based, at most `max_retries`) is about to
    /// start after its backoff delay.
    async fn on_retry(&self, operation: &str, attempt: u32, max_retries: u32);
}

/// Observer that only emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait]
impl RetryObserver for TracingObserver {
    async fn on_failure(&self, operation: &str, attempt: u32, error: &str) {
        warn!(operation, attempt, error, "operation failed");
    }

    async fn on_retry(&self, operation: &str, attempt: u32, max_retries: u32) {
        debug!(operation, attempt, max_retries, "retrying operation");
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay slept before retry `attempt`: `base_delay * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `f` until it succeeds or `max_retries` retries have failed.
    ///
    /// Every failure is reported through `observer.on_failure`. Before each
    /// retry `observer.on_retry` is awaited and then the backoff elapses.
    /// The error of the final attempt is returned unchanged.
    pub async fn run<T, E, F, Fut, O>(&self, operation: &str, observer: &O, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        O: RetryObserver + ?Sized,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    observer
                        .on_failure(operation, attempt, &err.to_string())
                        .await;
                    if attempt >= self.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    observer.on_retry(operation, attempt, self.max_retries).await;
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
            }
        }
    }
}
