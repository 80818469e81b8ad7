use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::event_bus::{DashboardEvent, EventBus};
use crate::types::{LogEntry, LogLevel};

pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Bounded, append-only operator log.
///
/// Holds the most recent `capacity` entries; the oldest entry is evicted
/// first. Each entry is also mirrored to `tracing`.
#[derive(Clone)]
pub struct LogSink {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
    bus: EventBus,
}

impl LogSink {
    pub fn new(capacity: usize, bus: EventBus) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            bus,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn append(&self, level: LogLevel, message: impl Into<String>, task_id: Option<&str>) {
        let entry = LogEntry {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
            task_id: task_id.map(str::to_string),
        };
        mirror(&entry);
        {
            let mut entries = self.entries.write().await;
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        self.bus.publish(DashboardEvent::LogAppended(entry));
    }

    pub async fn info(&self, message: impl Into<String>, task_id: Option<&str>) {
        self.append(LogLevel::Info, message, task_id).await;
    }

    pub async fn success(&self, message: impl Into<String>, task_id: Option<&str>) {
        self.append(LogLevel::Success, message, task_id).await;
    }

    pub async fn warning(&self, message: impl Into<String>, task_id: Option<&str>) {
        self.append(LogLevel::Warning, message, task_id).await;
    }

    pub async fn error(&self, message: impl Into<String>, task_id: Option<&str>) {
        self.append(LogLevel::Error, message, task_id).await;
    }

    pub async fn ai(&self, message: impl Into<String>, task_id: Option<&str>) {
        self.append(LogLevel::Ai, message, task_id).await;
    }

    /// Entries oldest first.
    pub async fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn mirror(entry: &LogEntry) {
    let task_id = entry.task_id.as_deref().unwrap_or("-");
    match entry.level {
        LogLevel::Warning => warn!(task_id, level = %entry.level, "{}", entry.message),
        LogLevel::Error => error!(task_id, level = %entry.level, "{}", entry.message),
        _ => info!(task_id, level = %entry.level, "{}", entry.message),
    }
}
