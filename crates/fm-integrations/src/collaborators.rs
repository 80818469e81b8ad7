use std::sync::Arc;

use async_trait::async_trait;
use fm_core::types::{
    AutomationActivity, AutomationEvent, ChatKind, ChatMessage, CodeBundle, CommerceMetrics,
    CommerceUpdate, DeploymentEndpoints, InfraBundle, ProjectFeedback, ResearchOutput, Task,
    TestSuite,
};

use crate::error::Result;
use crate::generation::Generated;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// External task tracker the work list comes from and finished tasks are
/// written back to.
#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// All tasks, in tracker order, as `Pending` with zero progress.
    async fn fetch_tasks(&self) -> Result<Vec<Task>>;

    async fn sync_task(&self, task: &Task) -> Result<bool>;
}

#[async_trait]
pub trait Researcher: Send + Sync {
    async fn conduct_research(&self, topic: &str) -> Result<ResearchOutput>;
}

#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate_code(&self, topic: &str, research: &ResearchOutput)
        -> Result<Generated<CodeBundle>>;
}

#[async_trait]
pub trait TestGenerator: Send + Sync {
    async fn generate_tests(
        &self,
        topic: &str,
        research: &ResearchOutput,
        code: &CodeBundle,
    ) -> Result<Generated<TestSuite>>;
}

/// Cloud storage and functions for a task, plus the reading-device sync of
/// research summaries.
#[async_trait]
pub trait InfraProvisioner: Send + Sync {
    async fn provision(&self, task: &Task) -> Result<InfraBundle>;

    async fn archive_research(&self, summary: &str) -> Result<()>;
}

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Commit the task's artifacts to `feature/<id>` and return the branch URL.
    async fn commit(&self, task: &Task) -> Result<String>;
}

/// Cross-system ("triangle") sync with the external workflow coordinator.
#[async_trait]
pub trait TriangleSync: Send + Sync {
    async fn notify_outbound(&self, task_id: &str) -> Result<()>;

    async fn pull_inbound(&self) -> Result<()>;
}

#[async_trait]
pub trait Deployer: Send + Sync {
    async fn trigger(&self, task: &Task) -> Result<DeploymentEndpoints>;
}

#[async_trait]
pub trait Commerce: Send + Sync {
    async fn fetch_metrics(&self) -> Result<CommerceMetrics>;

    async fn sync_task(&self, task: &Task) -> Result<CommerceUpdate>;
}

#[async_trait]
pub trait SpreadsheetSync: Send + Sync {
    async fn sync(&self, task: &Task, feedback: Option<&ProjectFeedback>) -> Result<()>;
}

#[async_trait]
pub trait AutomationTrigger: Send + Sync {
    async fn fire(&self, task: &Task, event: AutomationEvent) -> Result<AutomationActivity>;
}

#[async_trait]
pub trait SecureArchive: Send + Sync {
    /// Store `payload` under `name` and return its archive reference.
    async fn store(&self, name: &str, payload: serde_json::Value) -> Result<String>;
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post(&self, task: &Task, kind: ChatKind) -> Result<ChatMessage>;
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// One implementation per external concern, shared by the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub tracker: Arc<dyn TaskTracker>,
    pub researcher: Arc<dyn Researcher>,
    pub code_generator: Arc<dyn CodeGenerator>,
    pub test_generator: Arc<dyn TestGenerator>,
    pub infra: Arc<dyn InfraProvisioner>,
    pub source_control: Arc<dyn SourceControl>,
    pub triangle: Arc<dyn TriangleSync>,
    pub deployer: Arc<dyn Deployer>,
    pub commerce: Arc<dyn Commerce>,
    pub spreadsheet: Arc<dyn SpreadsheetSync>,
    pub automation: Arc<dyn AutomationTrigger>,
    pub archive: Arc<dyn SecureArchive>,
    pub chat: Arc<dyn ChatNotifier>,
}
