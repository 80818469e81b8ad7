//! Stand-in collaborators: each waits a fixed (scaled) latency and answers
//! with canned or random data.

mod cloud;
mod commerce;
mod model;
mod notify;
mod source_control;
mod tracker;

use std::sync::Arc;
use std::time::Duration;

use fm_core::config::IntegrationsConfig;

use crate::collaborators::Collaborators;
use crate::rng::Dice;

pub use cloud::{SimulatedArchive, SimulatedDeployer, SimulatedInfra};
pub use commerce::SimulatedCommerce;
pub use model::SimulatedModel;
pub use notify::{SimulatedAutomation, SimulatedChat, SimulatedTriangle};
pub use source_control::{SimulatedSourceControl, COMMIT_FAILURE_MESSAGE};
pub use tracker::{SimulatedSpreadsheet, SimulatedTracker, TOPIC_TEMPLATES};

/// Base latencies, in milliseconds, before scaling.
pub mod latency {
    pub const RESEARCH: u64 = 2000;
    pub const INFRA: u64 = 2000;
    pub const ARCHIVAL: u64 = 1200;
    pub const CODEGEN: u64 = 2500;
    pub const TESTS: u64 = 2000;
    pub const COMMIT: u64 = 1500;
    pub const TRIANGLE: u64 = 1200;
    pub const DEPLOY_FIREBASE: u64 = 2000;
    pub const DEPLOY_REPLIT: u64 = 1800;
    pub const COMMERCE: u64 = 1500;
    pub const TRACKER_SYNC: u64 = 800;
    pub const SPREADSHEET: u64 = 800;
    pub const AUTOMATION: u64 = 800;
    pub const ARCHIVE: u64 = 1000;
    pub const CHAT: u64 = 500;
}

/// Scales every simulated wait. A scale of zero skips waiting entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latency {
    scale: f64,
}

impl Latency {
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
        Self { scale }
    }

    pub fn scaled(&self, base_ms: u64) -> Duration {
        // saturate rather than overflow `Duration`
        Duration::try_from_secs_f64(base_ms as f64 * self.scale / 1000.0).unwrap_or(Duration::MAX)
    }

    pub async fn wait(&self, base_ms: u64) {
        let delay = self.scaled(base_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Collaborators {
    /// Every collaborator backed by its simulated implementation.
    pub fn simulated(config: &IntegrationsConfig) -> Self {
        let latency = Latency::new(config.latency_scale);
        let dice = Dice::new();
        let model = Arc::new(SimulatedModel::new(latency, dice.clone(), config.malformed_rate));
        let infra = Arc::new(SimulatedInfra::new(latency));
        let commerce = Arc::new(SimulatedCommerce::new(latency, dice.clone()));
        Self {
            tracker: Arc::new(SimulatedTracker::new(latency, config.task_count)),
            researcher: model.clone(),
            code_generator: model.clone(),
            test_generator: model,
            infra,
            source_control: Arc::new(SimulatedSourceControl::new(
                latency,
                dice.clone(),
                config.commit_failure_rate,
            )),
            triangle: Arc::new(SimulatedTriangle::new(latency)),
            deployer: Arc::new(SimulatedDeployer::new(latency)),
            commerce,
            spreadsheet: Arc::new(SimulatedSpreadsheet::new(latency)),
            automation: Arc::new(SimulatedAutomation::new(latency, dice.clone())),
            archive: Arc::new(SimulatedArchive::new(latency)),
            chat: Arc::new(SimulatedChat::new(latency, dice, config.chat_channel.clone())),
        }
    }
}
