use async_trait::async_trait;
use fm_core::types::{CommerceMetrics, CommerceUpdate, Task};
use tracing::info;

use super::{latency, Latency};
use crate::collaborators::Commerce;
use crate::error::Result;
use crate::rng::Dice;

pub struct SimulatedCommerce {
    latency: Latency,
    dice: Dice,
}

impl SimulatedCommerce {
    pub fn new(latency: Latency, dice: Dice) -> Self {
        Self { latency, dice }
    }
}

#[async_trait]
impl Commerce for SimulatedCommerce {
    async fn fetch_metrics(&self) -> Result<CommerceMetrics> {
        Ok(CommerceMetrics {
            sales: "$12,450.00".into(),
            orders: 142,
            conversion: "3.2%".into(),
        })
    }

    async fn sync_task(&self, task: &Task) -> Result<CommerceUpdate> {
        info!(task_id = %task.id, topic = %task.topic, "syncing project to storefront");
        self.latency.wait(latency::COMMERCE).await;
        Ok(CommerceUpdate {
            product_id: format!("gid://shopify/Product/{}", self.dice.below(1_000_000)),
            sync_status: "SUCCESS".into(),
            inventory_updated: true,
        })
    }
}
