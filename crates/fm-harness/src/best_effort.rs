use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Receives failures of best-effort work. Reporting is the only effect a
/// failure has.
#[async_trait]
pub trait FailureReporter: Send + Sync {
    async fn report(&self, label: &str, error: &str);
}

/// Run `fut` to completion, reporting an error instead of returning it.
pub async fn attempt<T, E, Fut, R>(label: &str, reporter: &R, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    R: FailureReporter + ?Sized,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(err) => {
            let message = err.to_string();
            warn!(label, error = %message, "best-effort operation failed");
            reporter.report(label, &message).await;
            None
        }
    }
}

// ---------------------------------------------------------------------------
// BestEffortSet
// ---------------------------------------------------------------------------

/// Background fan-out for fire-and-forget side effects.
///
/// Spawned work is never awaited by the caller. Finished entries are reaped
/// on every spawn; [`drain`](Self::drain) waits for whatever is still
/// running.
#[derive(Clone, Default)]
pub struct BestEffortSet {
    inner: Arc<Mutex<JoinSet<()>>>,
}

impl BestEffortSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<E, Fut>(&self, label: impl Into<String>, reporter: Arc<dyn FailureReporter>, fut: Fut)
    where
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let label = label.into();
        debug!(label = %label, "dispatching best-effort operation");
        let mut set = self.lock();
        while set.try_join_next().is_some() {}
        set.spawn(async move {
            attempt(&label, reporter.as_ref(), fut).await;
        });
    }

    /// Number of dispatched operations not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every operation dispatched so far.
    pub async fn drain(&self) {
        let mut set = std::mem::take(&mut *self.lock());
        while let Some(joined) = set.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "best-effort task panicked");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
