use async_trait::async_trait;
use fm_core::types::Task;
use tracing::info;

use super::{latency, Latency};
use crate::collaborators::SourceControl;
use crate::error::{IntegrationError, Result};
use crate::rng::Dice;

pub const COMMIT_FAILURE_MESSAGE: &str = "GitHub API rate limit exceeded or conflict detected.";

const REPO_URL: &str = "https://github.com/forge-mind-labs/projects/tree";

pub struct SimulatedSourceControl {
    latency: Latency,
    dice: Dice,
    failure_rate: f64,
}

impl SimulatedSourceControl {
    pub fn new(latency: Latency, dice: Dice, failure_rate: f64) -> Self {
        Self {
            latency,
            dice,
            failure_rate,
        }
    }
}

#[async_trait]
impl SourceControl for SimulatedSourceControl {
    async fn commit(&self, task: &Task) -> Result<String> {
        let branch = format!("feature/{}", task.id);
        info!(task_id = %task.id, branch = %branch, "committing artifacts");
        self.latency.wait(latency::COMMIT).await;

        if self.dice.chance(self.failure_rate) {
            return Err(IntegrationError::rejected("github", COMMIT_FAILURE_MESSAGE));
        }
        Ok(format!("{REPO_URL}/{branch}"))
    }
}
