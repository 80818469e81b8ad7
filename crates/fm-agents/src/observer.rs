use async_trait::async_trait;
use fm_core::log_sink::LogSink;
use fm_core::task_store::TaskStore;
use fm_harness::best_effort::FailureReporter;
use fm_harness::retry::RetryObserver;

/// Reports retries and best-effort failures of one task into the operator
/// log, and keeps the task's `retry_count` in step with the retry wrapper.
pub struct TaskObserver {
    task_id: String,
    tasks: TaskStore,
    logs: LogSink,
}

impl TaskObserver {
    pub fn new(task_id: impl Into<String>, tasks: TaskStore, logs: LogSink) -> Self {
        Self {
            task_id: task_id.into(),
            tasks,
            logs,
        }
    }
}

#[async_trait]
impl RetryObserver for TaskObserver {
    async fn on_failure(&self, operation: &str, _attempt: u32, error: &str) {
        self.logs
            .error(format!("{operation} failed: {error}"), Some(&self.task_id))
            .await;
    }

    async fn on_retry(&self, operation: &str, attempt: u32, max_retries: u32) {
        self.logs
            .warning(
                format!("Retrying {operation} ({attempt}/{max_retries})"),
                Some(&self.task_id),
            )
            .await;
        self.tasks
            .update(&self.task_id, |t| t.retry_count = attempt)
            .await;
    }
}

#[async_trait]
impl FailureReporter for TaskObserver {
    async fn report(&self, label: &str, error: &str) {
        self.logs
            .warning(format!("{label} skipped: {error}"), Some(&self.task_id))
            .await;
    }
}
