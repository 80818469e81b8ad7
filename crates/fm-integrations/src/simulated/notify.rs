use async_trait::async_trait;
use chrono::Utc;
use fm_core::types::{
    ActionStyle, ActivityStatus, AutomationActivity, AutomationEvent, ChatAction, ChatKind,
    ChatMessage, Task,
};
use tracing::info;

use super::{latency, Latency};
use crate::collaborators::{AutomationTrigger, ChatNotifier, TriangleSync};
use crate::error::Result;
use crate::rng::Dice;

pub struct SimulatedTriangle {
    latency: Latency,
}

impl SimulatedTriangle {
    pub fn new(latency: Latency) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl TriangleSync for SimulatedTriangle {
    async fn notify_outbound(&self, task_id: &str) -> Result<()> {
        info!(task_id, "dispatching outbound workflow sync");
        self.latency.wait(latency::TRIANGLE).await;
        Ok(())
    }

    async fn pull_inbound(&self) -> Result<()> {
        info!("pulling inbound workflow sync");
        self.latency.wait(latency::TRIANGLE).await;
        Ok(())
    }
}

pub struct SimulatedAutomation {
    latency: Latency,
    dice: Dice,
}

impl SimulatedAutomation {
    pub fn new(latency: Latency, dice: Dice) -> Self {
        Self { latency, dice }
    }
}

#[async_trait]
impl AutomationTrigger for SimulatedAutomation {
    async fn fire(&self, task: &Task, event: AutomationEvent) -> Result<AutomationActivity> {
        info!(task_id = %task.id, event = %event, "triggering automation");
        self.latency.wait(latency::AUTOMATION).await;
        let short: String = task.topic.chars().take(15).collect();
        Ok(AutomationActivity {
            id: format!("zap-{}", self.dice.base36(5)),
            name: format!("{event}: {short}..."),
            status: ActivityStatus::Success,
            timestamp: Utc::now(),
        })
    }
}

pub struct SimulatedChat {
    latency: Latency,
    dice: Dice,
    channel: String,
}

impl SimulatedChat {
    pub fn new(latency: Latency, dice: Dice, channel: String) -> Self {
        Self {
            latency,
            dice,
            channel,
        }
    }
}

fn action(label: &str, action: &str, style: ActionStyle) -> ChatAction {
    ChatAction {
        label: label.into(),
        action: action.into(),
        style,
    }
}

#[async_trait]
impl ChatNotifier for SimulatedChat {
    async fn post(&self, task: &Task, kind: ChatKind) -> Result<ChatMessage> {
        self.latency.wait(latency::CHAT).await;
        let (text, actions) = match kind {
            ChatKind::Status => (
                format!("*Task Update:* {} is now in phase: `{}`", task.topic, task.status),
                Vec::new(),
            ),
            ChatKind::Alert => (
                format!("*Action Required:* Task \"{}\" failed after retries.", task.topic),
                vec![action("Manual Retry", "retry", ActionStyle::Danger)],
            ),
            ChatKind::Completion => (
                format!("*Build Complete:* Artifacts for \"{}\" are ready.", task.topic),
                vec![
                    action("Approve & Deploy", "approve", ActionStyle::Primary),
                    action("View Details", "view", ActionStyle::Default),
                ],
            ),
        };
        info!(channel = %self.channel, task_id = %task.id, "{text}");
        Ok(ChatMessage {
            id: self.dice.base36(9),
            text,
            channel: self.channel.clone(),
            kind,
            timestamp: Utc::now(),
            actions,
        })
    }
}
