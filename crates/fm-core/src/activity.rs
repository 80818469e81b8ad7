use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::event_bus::{DashboardEvent, EventBus};
use crate::types::{AutomationActivity, ChatMessage};

const FEED_CAPACITY: usize = 50;

/// Automation runs and chat notifications, newest first.
#[derive(Clone)]
pub struct ActivityFeed {
    activities: Arc<RwLock<VecDeque<AutomationActivity>>>,
    chat: Arc<RwLock<VecDeque<ChatMessage>>>,
    bus: EventBus,
}

impl ActivityFeed {
    pub fn new(bus: EventBus) -> Self {
        Self {
            activities: Arc::new(RwLock::new(VecDeque::new())),
            chat: Arc::new(RwLock::new(VecDeque::new())),
            bus,
        }
    }

    pub async fn record_activity(&self, activity: AutomationActivity) {
        push_front_capped(&mut *self.activities.write().await, activity.clone());
        self.bus.publish(DashboardEvent::ActivityRecorded(activity));
    }

    pub async fn record_chat(&self, message: ChatMessage) {
        push_front_capped(&mut *self.chat.write().await, message.clone());
        self.bus.publish(DashboardEvent::ChatPosted(message));
    }

    pub async fn activities(&self) -> Vec<AutomationActivity> {
        self.activities.read().await.iter().cloned().collect()
    }

    pub async fn chat(&self) -> Vec<ChatMessage> {
        self.chat.read().await.iter().cloned().collect()
    }
}

fn push_front_capped<T>(items: &mut VecDeque<T>, item: T) {
    items.push_front(item);
    items.truncate(FEED_CAPACITY);
}
