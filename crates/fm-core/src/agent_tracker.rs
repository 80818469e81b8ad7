use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::event_bus::{DashboardEvent, EventBus};
use crate::types::{AgentKind, AgentRecord, AgentStatus};

/// Occupancy records for the four fixed pipeline agents.
#[derive(Clone)]
pub struct AgentTracker {
    agents: Arc<RwLock<Vec<AgentRecord>>>,
    bus: EventBus,
}

impl AgentTracker {
    pub fn new(bus: EventBus) -> Self {
        let agents = AgentKind::ALL.into_iter().map(AgentRecord::idle).collect();
        Self {
            agents: Arc::new(RwLock::new(agents)),
            bus,
        }
    }

    pub async fn snapshot(&self) -> Vec<AgentRecord> {
        self.agents.read().await.clone()
    }

    pub async fn get(&self, kind: AgentKind) -> AgentRecord {
        self.agents
            .read()
            .await
            .iter()
            .find(|a| a.kind == kind)
            .cloned()
            .unwrap_or_else(|| AgentRecord::idle(kind))
    }

    /// Mark `kind` as working on `label`.
    pub async fn activate(&self, kind: AgentKind, label: impl Into<String>) {
        let label = label.into();
        self.modify(|a| a.kind == kind, |a| {
            a.status = AgentStatus::Active;
            a.current_task = label.clone();
            a.progress = 0;
            a.started_at = Some(Utc::now());
        })
        .await;
    }

    /// Mark `kind` as idle with its phase finished.
    pub async fn complete(&self, kind: AgentKind) {
        self.modify(|a| a.kind == kind, |a| {
            a.status = AgentStatus::Idle;
            a.progress = 100;
        })
        .await;
    }

    /// Flip every currently active agent to `Error`. Returns the kinds that
    /// were flipped.
    pub async fn fail_active(&self) -> Vec<AgentKind> {
        self.modify(|a| a.status == AgentStatus::Active, |a| {
            a.status = AgentStatus::Error;
        })
        .await
    }

    /// Reset every agent to idle/0 regardless of what it was doing.
    pub async fn reset_all(&self) {
        self.modify(|_| true, |a| {
            a.status = AgentStatus::Idle;
            a.progress = 0;
        })
        .await;
    }

    async fn modify<P, F>(&self, select: P, mut apply: F) -> Vec<AgentKind>
    where
        P: Fn(&AgentRecord) -> bool,
        F: FnMut(&mut AgentRecord),
    {
        let changed: Vec<AgentRecord> = {
            let mut agents = self.agents.write().await;
            agents
                .iter_mut()
                .filter(|a| select(&**a))
                .map(|a| {
                    apply(a);
                    a.clone()
                })
                .collect()
        };
        let kinds = changed.iter().map(|a| a.kind).collect();
        for agent in changed {
            self.bus.publish(DashboardEvent::AgentUpdated(agent));
        }
        kinds
    }
}
