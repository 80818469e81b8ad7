use async_trait::async_trait;
use fm_core::types::{ProjectFeedback, Task, TaskPriority};
use tracing::info;

use super::{latency, Latency};
use crate::collaborators::{SpreadsheetSync, TaskTracker};
use crate::error::Result;

pub const TOPIC_TEMPLATES: [&str; 8] = [
    "Real-time Chat with Firebase & Gemini",
    "Automated Image Tagging with Vision API",
    "Serverless Payment Processing in Replit",
    "Sentiment Analysis for Customer Support",
    "Decentralized Storage UI using React",
    "Vector Search Engine for Knowledge Bases",
    "Predictive Analytics with BigQuery ML",
    "IoT Dashboard with Realtime Database",
];

const PRIORITY_CYCLE: [TaskPriority; 3] =
    [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

/// Task tracker that generates `count` tasks cycling through the topic
/// templates.
pub struct SimulatedTracker {
    latency: Latency,
    count: usize,
}

impl SimulatedTracker {
    pub fn new(latency: Latency, count: usize) -> Self {
        Self { latency, count }
    }
}

#[async_trait]
impl TaskTracker for SimulatedTracker {
    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let tasks = (0..self.count)
            .map(|i| {
                let topic = format!(
                    "{} (Iteration {})",
                    TOPIC_TEMPLATES[i % TOPIC_TEMPLATES.len()],
                    i / TOPIC_TEMPLATES.len() + 1
                );
                Task::new(format!("task-{}", i + 1), topic, PRIORITY_CYCLE[i % 3])
            })
            .collect();
        Ok(tasks)
    }

    async fn sync_task(&self, task: &Task) -> Result<bool> {
        self.latency.wait(latency::TRACKER_SYNC).await;
        info!(task_id = %task.id, status = %task.status, page = %task.tracker_page_id, "tracker page updated");
        Ok(true)
    }
}

/// Master spreadsheet of finished projects.
pub struct SimulatedSpreadsheet {
    latency: Latency,
}

impl SimulatedSpreadsheet {
    pub fn new(latency: Latency) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl SpreadsheetSync for SimulatedSpreadsheet {
    async fn sync(&self, task: &Task, feedback: Option<&ProjectFeedback>) -> Result<()> {
        info!(task_id = %task.id, topic = %task.topic, "updating master tracker sheet");
        if let Some(feedback) = feedback {
            info!(task_id = %task.id, "recording user rating {}/5", feedback.rating);
        }
        self.latency.wait(latency::SPREADSHEET).await;
        Ok(())
    }
}
