use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Researching,
    GeneratingCode,
    Testing,
    Tested,
    /// Declared for the dashboard legend; the pipeline never produces it.
    TestFailed,
    Committing,
    Deploying,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Returns `true` while a task is being driven through the pipeline.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TaskStatus::Researching
                | TaskStatus::GeneratingCode
                | TaskStatus::Testing
                | TaskStatus::Tested
                | TaskStatus::Committing
                | TaskStatus::Deploying
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Researching => "Researching",
            TaskStatus::GeneratingCode => "Generating Code",
            TaskStatus::Testing => "Testing",
            TaskStatus::Tested => "Tested",
            TaskStatus::TestFailed => "Test Failed",
            TaskStatus::Committing => "Committing",
            TaskStatus::Deploying => "Deploying",
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// TaskPriority
// ---------------------------------------------------------------------------

/// Queue priority. Variant order is dequeue order: an ascending sort puts
/// `High` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::Low => "Low",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub summary: String,
    pub sources: Vec<Source>,
    pub key_findings: Vec<String>,
}

/// The three code payloads produced by the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBundle {
    pub firebase: String,
    pub ai_studio: String,
    pub replit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    pub framework: String,
    pub test_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraBundle {
    pub bucket: String,
    pub function_arn: String,
    pub archive_sync: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEndpoints {
    pub firebase: String,
    pub replit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommerceUpdate {
    pub product_id: String,
    pub sync_status: String,
    pub inventory_updated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommerceMetrics {
    pub sales: String,
    pub orders: u32,
    pub conversion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFeedback {
    pub rating: u8,
    pub comments: String,
    pub submitted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub topic: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress: u8,
    pub retry_count: u32,
    pub research: Option<ResearchOutput>,
    pub code: Option<CodeBundle>,
    pub unit_tests: Option<TestSuite>,
    pub infra: Option<InfraBundle>,
    pub commerce_update: Option<CommerceUpdate>,
    pub error: Option<String>,
    pub feedback: Option<ProjectFeedback>,
    /// Page id in the external task tracker the task was fetched from.
    pub tracker_page_id: String,
}

impl Task {
    pub fn new(id: impl Into<String>, topic: impl Into<String>, priority: TaskPriority) -> Self {
        let id = id.into();
        Self {
            tracker_page_id: format!("tracker-page-{}", id.trim_start_matches("task-")),
            id,
            topic: topic.into(),
            status: TaskStatus::Pending,
            priority,
            progress: 0,
            retry_count: 0,
            research: None,
            code: None,
            unit_tests: None,
            infra: None,
            commerce_update: None,
            error: None,
            feedback: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }

    /// Every artifact the pipeline produces has been recorded.
    pub fn has_all_artifacts(&self) -> bool {
        self.research.is_some()
            && self.code.is_some()
            && self.unit_tests.is_some()
            && self.infra.is_some()
            && self.commerce_update.is_some()
    }

    /// Apply a status change together with the progress it implies.
    ///
    /// Progress never moves backwards during a run; `Failed` keeps the last
    /// progress value.
    pub fn advance(&mut self, status: TaskStatus, progress: u8) {
        self.status = status;
        self.progress = self.progress.max(progress.min(100));
    }

    /// Move the task to `Failed`, recording the failure message.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.status = TaskStatus::Failed;
        self.error = Some(if error.is_empty() {
            "unknown failure".to_string()
        } else {
            error
        });
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// The four fixed worker slots, one per pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Research,
    #[serde(rename = "codegen")]
    CodeGen,
    Test,
    Deploy,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Research,
        AgentKind::CodeGen,
        AgentKind::Test,
        AgentKind::Deploy,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AgentKind::Research => "research",
            AgentKind::CodeGen => "codegen",
            AgentKind::Test => "test",
            AgentKind::Deploy => "deploy",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Research => "Research Agent",
            AgentKind::CodeGen => "CodeGen Agent",
            AgentKind::Test => "Test Agent",
            AgentKind::Deploy => "Deploy Agent",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        AgentKind::ALL.into_iter().find(|k| k.id() == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Active,
    Error,
}

impl AgentStatus {
    pub fn glyph(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "*",
            AgentStatus::Active => "@",
            AgentStatus::Error => "x",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub kind: AgentKind,
    pub name: String,
    pub status: AgentStatus,
    /// Display label of the work in progress, not a task reference.
    pub current_task: String,
    pub progress: u8,
    pub started_at: Option<DateTime<Utc>>,
}

impl AgentRecord {
    pub fn idle(kind: AgentKind) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            status: AgentStatus::Idle,
            current_task: String::new(),
            progress: 0,
            started_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Ai,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "OK",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Ai => "AI",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Local wall-clock time, `HH:MM:SS` (24h).
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub task_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Automation activity / chat
// ---------------------------------------------------------------------------

/// Event types the automation trigger accepts. Only `Completion` is fired by
/// the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutomationEvent {
    Completion,
    Error,
    Deploy,
}

impl fmt::Display for AutomationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AutomationEvent::Completion => "COMPLETION",
            AutomationEvent::Error => "ERROR",
            AutomationEvent::Deploy => "DEPLOY",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Running,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationActivity {
    pub id: String,
    pub name: String,
    pub status: ActivityStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Status,
    Alert,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    Primary,
    Danger,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAction {
    pub label: String,
    pub action: String,
    pub style: ActionStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub channel: String,
    pub kind: ChatKind,
    pub timestamp: DateTime<Utc>,
    pub actions: Vec<ChatAction>,
}

// ---------------------------------------------------------------------------
// DashboardSummary
// ---------------------------------------------------------------------------

/// Header counters derived from the task store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_flight: usize,
    pub pending: usize,
    /// Completed / (completed + failed), as a percentage. `None` until a
    /// task reaches a terminal state.
    pub success_rate: Option<f64>,
}

impl DashboardSummary {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut summary = DashboardSummary::default();
        for task in tasks {
            summary.total += 1;
            match task.status {
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Pending => summary.pending += 1,
                s if s.is_in_flight() => summary.in_flight += 1,
                _ => {}
            }
        }
        let finished = summary.completed + summary.failed;
        if finished > 0 {
            summary.success_rate = Some(summary.completed as f64 * 100.0 / finished as f64);
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
