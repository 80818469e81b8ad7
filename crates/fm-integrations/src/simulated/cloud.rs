use async_trait::async_trait;
use fm_core::types::{DeploymentEndpoints, InfraBundle, Task};
use tracing::info;

use super::{latency, Latency};
use crate::collaborators::{Deployer, InfraProvisioner, SecureArchive};
use crate::error::Result;

pub struct SimulatedInfra {
    latency: Latency,
}

impl SimulatedInfra {
    pub fn new(latency: Latency) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl InfraProvisioner for SimulatedInfra {
    async fn provision(&self, task: &Task) -> Result<InfraBundle> {
        info!(task_id = %task.id, "provisioning bucket and function");
        self.latency.wait(latency::INFRA).await;
        Ok(InfraBundle {
            bucket: format!("s3://forgemind-artifacts-{}", task.id),
            function_arn: format!(
                "arn:aws:lambda:us-east-1:123456789:function:handler-{}",
                task.id
            ),
            archive_sync: true,
        })
    }

    async fn archive_research(&self, summary: &str) -> Result<()> {
        info!(bytes = summary.len(), "syncing research to reading library");
        self.latency.wait(latency::ARCHIVAL).await;
        Ok(())
    }
}

pub struct SimulatedDeployer {
    latency: Latency,
}

impl SimulatedDeployer {
    pub fn new(latency: Latency) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Deployer for SimulatedDeployer {
    async fn trigger(&self, task: &Task) -> Result<DeploymentEndpoints> {
        info!(task_id = %task.id, topic = %task.topic, "triggering production build");
        let firebase = async {
            self.latency.wait(latency::DEPLOY_FIREBASE).await;
            format!("https://{}.web.app", task.id)
        };
        let replit = async {
            self.latency.wait(latency::DEPLOY_REPLIT).await;
            format!("https://replit.com/@user/{}", task.id)
        };
        let (firebase, replit) = tokio::join!(firebase, replit);
        Ok(DeploymentEndpoints { firebase, replit })
    }
}

pub struct SimulatedArchive {
    latency: Latency,
}

impl SimulatedArchive {
    pub fn new(latency: Latency) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl SecureArchive for SimulatedArchive {
    async fn store(&self, name: &str, payload: serde_json::Value) -> Result<String> {
        info!(name, bytes = payload.to_string().len(), "storing encrypted artifact");
        self.latency.wait(latency::ARCHIVE).await;
        Ok(format!("proton://drive/ForgeMind/{name}"))
    }
}
