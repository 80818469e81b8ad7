use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{AgentRecord, AutomationActivity, ChatMessage, LogEntry, Task};

/// State changes published to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DashboardEvent {
    TaskUpdated(Task),
    TasksReplaced(usize),
    AgentUpdated(AgentRecord),
    LogAppended(LogEntry),
    ActivityRecorded(AutomationActivity),
    ChatPosted(ChatMessage),
    RunStateChanged { running: bool },
}

/// A broadcast-style event bus built on top of flume channels.
///
/// Each call to [`subscribe`](Self::subscribe) creates a new receiver that
/// sees every event published after the subscription was created. Cloning
/// the bus shares the subscriber list.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Vec<flume::Sender<DashboardEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> flume::Receiver<DashboardEvent> {
        let (tx, rx) = flume::unbounded();
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.push(tx);
        rx
    }

    /// Publish an event to all current subscribers.
    ///
    /// Disconnected subscribers (whose receivers have been dropped) are
    /// pruned.
    pub fn publish(&self, event: DashboardEvent) {
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_events() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(DashboardEvent::RunStateChanged { running: true });

        assert!(matches!(
            rx1.try_recv(),
            Ok(DashboardEvent::RunStateChanged { running: true })
        ));
        assert!(matches!(
            rx2.try_recv(),
            Ok(DashboardEvent::RunStateChanged { running: true })
        ));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        bus.publish(DashboardEvent::TasksReplaced(0));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
