#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fm_agents::Orchestrator;
use fm_core::config::PipelineConfig;
use fm_core::event_bus::DashboardEvent;
use fm_core::types::{
    ActivityStatus, AutomationActivity, AutomationEvent, ChatKind, ChatMessage, CodeBundle,
    CommerceMetrics, CommerceUpdate, DeploymentEndpoints, InfraBundle, ProjectFeedback,
    ResearchOutput, Source, Task, TaskPriority, TaskStatus, TestSuite,
};
use fm_integrations::collaborators::{
    AutomationTrigger, ChatNotifier, CodeGenerator, Commerce, Deployer, InfraProvisioner,
    Researcher, SecureArchive, SourceControl, SpreadsheetSync, TaskTracker, TestGenerator,
    TriangleSync,
};
use fm_integrations::generation::{placeholder_code, placeholder_tests};
use fm_integrations::simulated::COMMIT_FAILURE_MESSAGE;
use fm_integrations::{Collaborators, Generated, IntegrationError, Result};

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Every collaborator in one struct, answering instantly (or after
/// `step_delay`) with fixed data.
#[derive(Default)]
pub struct Mock {
    tasks: Vec<Task>,
    step_delay: Duration,
    failing_commits: HashSet<String>,
    transient_commits: Mutex<HashMap<String, u32>>,
    fail_fetch: bool,
    fail_triangle: bool,
    fail_archive: bool,
    fail_infra: bool,
    fail_commerce: bool,
    fail_archival: bool,
    fail_outbound: bool,
    panicking_topics: HashSet<String>,
    degraded: bool,
    research_order: Mutex<Vec<String>>,
    ratings: Mutex<Vec<(String, u8)>>,
}

impl Mock {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Every commit of `id` fails.
    pub fn failing_commit(mut self, id: &str) -> Self {
        self.failing_commits.insert(id.to_string());
        self
    }

    /// The first `times` commits of `id` fail.
    pub fn flaky_commit(self, id: &str, times: u32) -> Self {
        self.transient_commits
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_triangle(mut self) -> Self {
        self.fail_triangle = true;
        self
    }

    pub fn failing_archive(mut self) -> Self {
        self.fail_archive = true;
        self
    }

    /// Provisioning always fails, while research for the same task succeeds.
    pub fn failing_infra(mut self) -> Self {
        self.fail_infra = true;
        self
    }

    pub fn failing_commerce(mut self) -> Self {
        self.fail_commerce = true;
        self
    }

    /// Background archival of research summaries fails.
    pub fn failing_archival(mut self) -> Self {
        self.fail_archival = true;
        self
    }

    /// Outbound triangle notifications fail; inbound pulls still succeed.
    pub fn failing_outbound(mut self) -> Self {
        self.fail_outbound = true;
        self
    }

    /// Research on `topic` panics after being recorded.
    pub fn panicking_research(mut self, topic: &str) -> Self {
        self.panicking_topics.insert(topic.to_string());
        self
    }

    pub fn degraded_generators(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Topics in the order research was requested.
    pub fn research_order(&self) -> Vec<String> {
        self.research_order.lock().unwrap().clone()
    }

    /// `(task id, rating)` for every spreadsheet sync that carried feedback.
    pub fn ratings(&self) -> Vec<(String, u8)> {
        self.ratings.lock().unwrap().clone()
    }

    pub fn into_collaborators(self) -> (Arc<Mock>, Collaborators) {
        let mock = Arc::new(self);
        let collab = Collaborators {
            tracker: mock.clone(),
            researcher: mock.clone(),
            code_generator: mock.clone(),
            test_generator: mock.clone(),
            infra: mock.clone(),
            source_control: mock.clone(),
            triangle: mock.clone(),
            deployer: mock.clone(),
            commerce: mock.clone(),
            spreadsheet: mock.clone(),
            automation: mock.clone(),
            archive: mock.clone(),
            chat: mock.clone(),
        };
        (mock, collab)
    }

    async fn pause(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }
}

#[async_trait]
impl TaskTracker for Mock {
    async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        if self.fail_fetch {
            return Err(IntegrationError::unavailable("tracker", "connection refused"));
        }
        Ok(self.tasks.clone())
    }

    async fn sync_task(&self, _task: &Task) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl Researcher for Mock {
    async fn conduct_research(&self, topic: &str) -> Result<ResearchOutput> {
        self.research_order.lock().unwrap().push(topic.to_string());
        if self.panicking_topics.contains(topic) {
            panic!("research backend crashed on {topic}");
        }
        self.pause().await;
        Ok(ResearchOutput {
            summary: format!("Notes on {topic}"),
            sources: vec![Source {
                title: "Docs".into(),
                uri: "https://docs.example.com".into(),
            }],
            key_findings: vec!["one".into(), "two".into()],
        })
    }
}

#[async_trait]
impl CodeGenerator for Mock {
    async fn generate_code(
        &self,
        _topic: &str,
        _research: &ResearchOutput,
    ) -> Result<Generated<CodeBundle>> {
        self.pause().await;
        if self.degraded {
            return Ok(Generated::Degraded {
                payload: placeholder_code(),
                reason: "expected value at line 1 column 1".into(),
            });
        }
        Ok(Generated::Parsed(CodeBundle {
            firebase: "export const f = 1;".into(),
            ai_studio: "export const a = 1;".into(),
            replit: "print(1)".into(),
        }))
    }
}

#[async_trait]
impl TestGenerator for Mock {
    async fn generate_tests(
        &self,
        _topic: &str,
        _research: &ResearchOutput,
        _code: &CodeBundle,
    ) -> Result<Generated<TestSuite>> {
        self.pause().await;
        if self.degraded {
            return Ok(Generated::Degraded {
                payload: placeholder_tests(),
                reason: "EOF while parsing".into(),
            });
        }
        Ok(Generated::Parsed(TestSuite {
            framework: "Jest".into(),
            test_code: "test('ok', () => {})".into(),
            results: None,
        }))
    }
}

#[async_trait]
impl InfraProvisioner for Mock {
    async fn provision(&self, task: &Task) -> Result<InfraBundle> {
        self.pause().await;
        if self.fail_infra {
            return Err(IntegrationError::unavailable("infra", "region capacity exhausted"));
        }
        Ok(InfraBundle {
            bucket: format!("s3://bucket-{}", task.id),
            function_arn: format!("arn:fn:{}", task.id),
            archive_sync: true,
        })
    }

    async fn archive_research(&self, _summary: &str) -> Result<()> {
        if self.fail_archival {
            return Err(IntegrationError::unavailable("reader", "sync refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceControl for Mock {
    async fn commit(&self, task: &Task) -> Result<String> {
        self.pause().await;
        if self.failing_commits.contains(&task.id) {
            return Err(IntegrationError::rejected("github", COMMIT_FAILURE_MESSAGE));
        }
        {
            let mut transient = self.transient_commits.lock().unwrap();
            if let Some(left) = transient.get_mut(&task.id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(IntegrationError::rejected("github", COMMIT_FAILURE_MESSAGE));
                }
            }
        }
        Ok(format!("https://git.example.com/tree/feature/{}", task.id))
    }
}

#[async_trait]
impl TriangleSync for Mock {
    async fn notify_outbound(&self, _task_id: &str) -> Result<()> {
        if self.fail_outbound {
            return Err(IntegrationError::unavailable("triangle", "coordinator offline"));
        }
        Ok(())
    }

    async fn pull_inbound(&self) -> Result<()> {
        if self.fail_triangle {
            return Err(IntegrationError::unavailable("triangle", "coordinator offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl Deployer for Mock {
    async fn trigger(&self, task: &Task) -> Result<DeploymentEndpoints> {
        self.pause().await;
        Ok(DeploymentEndpoints {
            firebase: format!("https://{}.web.app", task.id),
            replit: format!("https://replit.com/@user/{}", task.id),
        })
    }
}

#[async_trait]
impl Commerce for Mock {
    async fn fetch_metrics(&self) -> Result<CommerceMetrics> {
        Ok(CommerceMetrics {
            sales: "$10.00".into(),
            orders: 1,
            conversion: "1.0%".into(),
        })
    }

    async fn sync_task(&self, task: &Task) -> Result<CommerceUpdate> {
        if self.fail_commerce {
            return Err(IntegrationError::rejected("shopify", "product handle taken"));
        }
        Ok(CommerceUpdate {
            product_id: format!("gid://shop/Product/{}", task.id),
            sync_status: "SUCCESS".into(),
            inventory_updated: true,
        })
    }
}

#[async_trait]
impl SpreadsheetSync for Mock {
    async fn sync(&self, task: &Task, feedback: Option<&ProjectFeedback>) -> Result<()> {
        if let Some(feedback) = feedback {
            self.ratings
                .lock()
                .unwrap()
                .push((task.id.clone(), feedback.rating));
        }
        Ok(())
    }
}

#[async_trait]
impl AutomationTrigger for Mock {
    async fn fire(&self, task: &Task, event: AutomationEvent) -> Result<AutomationActivity> {
        Ok(AutomationActivity {
            id: format!("zap-{}", task.id),
            name: format!("{event}: {}", task.topic),
            status: ActivityStatus::Success,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl SecureArchive for Mock {
    async fn store(&self, name: &str, _payload: serde_json::Value) -> Result<String> {
        if self.fail_archive {
            return Err(IntegrationError::unavailable("archive", "quota exceeded"));
        }
        Ok(format!("vault://{name}"))
    }
}

#[async_trait]
impl ChatNotifier for Mock {
    async fn post(&self, task: &Task, kind: ChatKind) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: format!("msg-{}", task.id),
            text: format!("{:?} for {}", kind, task.topic),
            channel: "#test".into(),
            kind,
            timestamp: Utc::now(),
            actions: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn task(id: &str, topic: &str, priority: TaskPriority) -> Task {
    Task::new(id, topic, priority)
}

/// Short pacing so runs finish quickly; backoff stays at the real base.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        pacing_ms: 100,
        ..PipelineConfig::default()
    }
}

pub async fn orchestrator(mock: Mock) -> (Orchestrator, Arc<Mock>) {
    let (mock, collab) = mock.into_collaborators();
    let orch = Orchestrator::new(collab, &test_config());
    orch.initialize().await.unwrap();
    (orch, mock)
}

/// Drive a run to completion, including background side effects.
pub async fn run_to_completion(orch: &Orchestrator) {
    orch.start().await;
    orch.wait_for_drain().await;
    orch.wait_for_side_effects().await;
}

/// Block until `id` enters its first in-flight status.
pub async fn wait_until_in_flight(rx: &flume::Receiver<DashboardEvent>, id: &str) {
    while let Ok(event) = rx.recv_async().await {
        if let DashboardEvent::TaskUpdated(task) = event {
            if task.id == id && task.status.is_in_flight() {
                return;
            }
        }
    }
    panic!("event bus closed before {id} started");
}

/// Terminal-state properties every task must satisfy.
pub fn assert_terminal_invariants(tasks: &[Task]) {
    for task in tasks {
        match task.status {
            TaskStatus::Completed => {
                assert_eq!(task.progress, 100, "{} completed below 100%", task.id);
                assert!(task.has_all_artifacts(), "{} missing artifacts", task.id);
            }
            TaskStatus::Failed => {
                let error = task.error.as_deref().unwrap_or_default();
                assert!(!error.is_empty(), "{} failed without an error", task.id);
            }
            _ => {}
        }
    }
}
