use std::sync::Arc;

use tokio::sync::RwLock;

use crate::event_bus::{DashboardEvent, EventBus};
use crate::types::{DashboardSummary, Task};

/// In-memory collection of tasks, kept in the order they were fetched.
///
/// Every mutation happens under a single write guard and is published as a
/// [`DashboardEvent::TaskUpdated`] once the guard is released.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<RwLock<Vec<Task>>>,
    bus: EventBus,
}

impl TaskStore {
    pub fn new(bus: EventBus) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
            bus,
        }
    }

    /// Replace the whole collection (initialization only).
    pub async fn replace_all(&self, tasks: Vec<Task>) {
        let count = tasks.len();
        *self.tasks.write().await = tasks;
        self.bus.publish(DashboardEvent::TasksReplaced(count));
    }

    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Apply `f` to the task with `id` and return the updated snapshot, or
    /// `None` when no such task exists.
    pub async fn update<F>(&self, id: &str, f: F) -> Option<Task>
    where
        F: FnOnce(&mut Task),
    {
        let updated = {
            let mut tasks = self.tasks.write().await;
            let task = tasks.iter_mut().find(|t| t.id == id)?;
            f(task);
            task.clone()
        };
        self.bus.publish(DashboardEvent::TaskUpdated(updated.clone()));
        Some(updated)
    }

    pub async fn summary(&self) -> DashboardSummary {
        DashboardSummary::from_tasks(self.tasks.read().await.iter())
    }
}
