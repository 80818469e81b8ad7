//! Run control for the single-flight pipeline scheduler.
//!
//! [`Orchestrator`] owns the queue and the running flag behind one mutex.
//! At most one drain loop exists at a time: `start` spawns one only when no
//! loop is alive, and a loop that is still finishing an in-flight task after
//! `stop` picks up the queue of a later `start` itself.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use fm_core::activity::ActivityFeed;
use fm_core::agent_tracker::AgentTracker;
use fm_core::config::PipelineConfig;
use fm_core::event_bus::{DashboardEvent, EventBus};
use fm_core::log_sink::LogSink;
use fm_core::task_store::TaskStore;
use fm_core::types::{
    AgentRecord, AutomationActivity, ChatMessage, CommerceMetrics, DashboardSummary, LogEntry,
    ProjectFeedback, Task, TaskStatus,
};
use fm_harness::best_effort::BestEffortSet;
use fm_harness::retry::RetryPolicy;
use fm_integrations::Collaborators;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info};

use crate::error::{InitError, IntentError};
use crate::observer::TaskObserver;
use crate::pipeline::{Pipeline, TaskOutcome};
use crate::queue::build_queue;

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    queue: VecDeque<String>,
    /// A drain loop task exists (it may be finishing work after a stop).
    drain_active: bool,
}

/// Clears the run flags if the drain loop unwinds or is cancelled before
/// reaching a normal exit, so later `start` and `wait_for_drain` calls
/// still work.
struct DrainGuard {
    inner: Arc<Inner>,
    armed: bool,
}

impl DrainGuard {
    fn new(inner: Arc<Inner>) -> Self {
        Self { inner, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        error!("drain loop ended abnormally, clearing run state");
        match self.inner.run.try_lock() {
            Ok(mut run) => {
                run.running = false;
                run.drain_active = false;
                run.queue.clear();
            }
            Err(_) => {
                let inner = self.inner.clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        let mut run = inner.run.lock().await;
                        run.running = false;
                        run.drain_active = false;
                        run.queue.clear();
                    });
                }
            }
        }
        self.inner.drain_busy.send_replace(false);
        self.inner
            .bus
            .publish(DashboardEvent::RunStateChanged { running: false });
    }
}

enum Step {
    Next(String),
    Stopped,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A run began with this many queued tasks.
    Started { queued: usize },
    /// A run was already in progress; nothing changed.
    AlreadyRunning,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct Inner {
    bus: EventBus,
    tasks: TaskStore,
    agents: AgentTracker,
    logs: LogSink,
    activity: ActivityFeed,
    collab: Collaborators,
    side_effects: BestEffortSet,
    pipeline: Pipeline,
    pacing: Duration,
    run: Mutex<RunState>,
    drain_busy: watch::Sender<bool>,
    selected: RwLock<Option<String>>,
    metrics: RwLock<Option<CommerceMetrics>>,
}

/// Entry point for the presentation layer: run control, initialization,
/// operator intents and read-only snapshots.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(collab: Collaborators, config: &PipelineConfig) -> Self {
        let bus = EventBus::new();
        let tasks = TaskStore::new(bus.clone());
        let agents = AgentTracker::new(bus.clone());
        let logs = LogSink::new(config.log_capacity, bus.clone());
        let activity = ActivityFeed::new(bus.clone());
        let side_effects = BestEffortSet::new();
        let retry = RetryPolicy::new(config.max_retries, config.base_backoff());
        let pipeline = Pipeline::new(
            collab.clone(),
            tasks.clone(),
            agents.clone(),
            logs.clone(),
            activity.clone(),
            side_effects.clone(),
            retry,
        );
        let (drain_busy, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                bus,
                tasks,
                agents,
                logs,
                activity,
                collab,
                side_effects,
                pipeline,
                pacing: config.pacing(),
                run: Mutex::new(RunState::default()),
                drain_busy,
                selected: RwLock::new(None),
                metrics: RwLock::new(None),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// Load the task list and commerce metrics and prime the queue without
    /// starting a run. On any failure the task list stays empty.
    pub async fn initialize(&self) -> Result<usize, InitError> {
        {
            let run = self.inner.run.lock().await;
            if run.running || run.drain_active {
                return Err(InitError::RunActive);
            }
        }
        self.inner
            .logs
            .info("Initializing multi-agent orchestrator...", None)
            .await;

        match self.load().await {
            Ok(count) => {
                info!(tasks = count, "orchestrator initialized");
                self.inner
                    .logs
                    .success(
                        "Synchronized with AI Workflow Architect. Commerce analytics fetched.",
                        None,
                    )
                    .await;
                Ok(count)
            }
            Err(err) => {
                error!(error = %err, "initialization failed");
                self.inner
                    .logs
                    .error("Critical failure: could not reach orchestration pool.", None)
                    .await;
                Err(err)
            }
        }
    }

    async fn load(&self) -> Result<usize, InitError> {
        let collab = &self.inner.collab;
        let (tasks, metrics) =
            tokio::try_join!(collab.tracker.fetch_tasks(), collab.commerce.fetch_metrics())?;
        let tasks: Vec<Task> = tasks
            .into_iter()
            .map(|mut t| {
                t.retry_count = 0;
                t
            })
            .collect();
        let queue = build_queue(&tasks);

        collab.triangle.pull_inbound().await?;

        let count = tasks.len();
        self.inner.tasks.replace_all(tasks).await;
        *self.inner.metrics.write().await = Some(metrics);
        let mut run = self.inner.run.lock().await;
        if !run.running {
            run.queue = queue;
        }
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    /// Begin draining every non-completed task in priority order.
    ///
    /// Idempotent while running: the current run keeps its queue and no
    /// second drain loop is created.
    pub async fn start(&self) -> StartOutcome {
        let snapshot = self.inner.tasks.snapshot().await;
        let mut run = self.inner.run.lock().await;
        if run.running {
            debug!("start ignored, run already active");
            return StartOutcome::AlreadyRunning;
        }

        run.queue = build_queue(&snapshot);
        run.running = true;
        let queued = run.queue.len();
        let spawn_loop = !run.drain_active;
        run.drain_active = true;
        self.inner.drain_busy.send_replace(true);

        self.inner.bus.publish(DashboardEvent::RunStateChanged { running: true });
        self.inner
            .logs
            .info("Sequence active. Priority sorting applied.", None)
            .await;
        info!(queued, reuse_loop = !spawn_loop, "run started");

        if spawn_loop {
            let this = self.clone();
            tokio::spawn(async move { this.drain().await });
        }
        StartOutcome::Started { queued }
    }

    /// Stop dequeuing. Work already dispatched runs to completion; every
    /// agent is reset to idle. Safe to call repeatedly.
    pub async fn stop(&self) {
        {
            let mut run = self.inner.run.lock().await;
            run.running = false;
            run.queue.clear();
            self.inner
                .logs
                .warning("Pipeline suspended by root command.", None)
                .await;
        }
        self.inner.agents.reset_all().await;
        self.inner
            .bus
            .publish(DashboardEvent::RunStateChanged { running: false });
        info!("run stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.run.lock().await.running
    }

    /// Ids still waiting in the queue, in dequeue order.
    pub async fn queued(&self) -> Vec<String> {
        self.inner.run.lock().await.queue.iter().cloned().collect()
    }

    /// Wait until no drain loop is alive.
    pub async fn wait_for_drain(&self) {
        let mut rx = self.inner.drain_busy.subscribe();
        // the sender lives in `inner`, so this only errs if we were dropped
        let _ = rx.wait_for(|busy| !*busy).await;
    }

    /// Wait for fire-and-forget side effects dispatched so far.
    pub async fn wait_for_side_effects(&self) {
        self.inner.side_effects.drain().await;
    }

    async fn drain(self) {
        debug!("drain loop started");
        let mut guard = DrainGuard::new(self.inner.clone());
        loop {
            match self.next_step().await {
                Step::Next(id) => {
                    let Some(task) = self.inner.tasks.get(&id).await else {
                        debug!(task_id = %id, "queued task missing, skipping");
                        continue;
                    };
                    if task.status == TaskStatus::Completed {
                        debug!(task_id = %id, "task already completed, skipping");
                        continue;
                    }
                    let Some(outcome) = self.process(task).await else {
                        debug!("drain loop cancelled");
                        return;
                    };
                    if let TaskOutcome::Failed(reason) = &outcome {
                        debug!(task_id = %id, reason = %reason, "continuing after failure");
                    }
                    tokio::time::sleep(self.inner.pacing).await;
                }
                Step::Stopped => {
                    guard.disarm();
                    debug!("drain loop exiting after stop");
                    return;
                }
                Step::Finished => {
                    guard.disarm();
                    self.inner
                        .bus
                        .publish(DashboardEvent::RunStateChanged { running: false });
                    info!("batch complete");
                    return;
                }
            }
        }
    }

    /// Run one task on its own tokio task so a panic inside the pipeline
    /// fails that task instead of killing the drain loop. `None` means the
    /// runtime cancelled the task.
    async fn process(&self, task: Task) -> Option<TaskOutcome> {
        let pipeline = self.inner.pipeline.clone();
        let snapshot = task.clone();
        match tokio::spawn(async move { pipeline.run_task(task).await }).await {
            Ok(outcome) => Some(outcome),
            Err(join) if join.is_panic() => {
                let reason = format!("pipeline panicked: {}", panic_message(join.into_panic()));
                error!(task_id = %snapshot.id, %reason, "task panicked");
                Some(self.inner.pipeline.abandon(&snapshot, &reason).await)
            }
            Err(_) => None,
        }
    }

    async fn next_step(&self) -> Step {
        let mut run = self.inner.run.lock().await;
        if !run.running {
            run.drain_active = false;
            self.inner.drain_busy.send_replace(false);
            return Step::Stopped;
        }
        match run.queue.pop_front() {
            Some(id) => Step::Next(id),
            None => {
                run.running = false;
                run.drain_active = false;
                self.inner
                    .logs
                    .success("Batch orchestration complete.", None)
                    .await;
                self.inner.drain_busy.send_replace(false);
                Step::Finished
            }
        }
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    pub async fn select_task(&self, id: &str) -> Result<Task, IntentError> {
        let task = self
            .inner
            .tasks
            .get(id)
            .await
            .ok_or_else(|| IntentError::TaskNotFound(id.to_string()))?;
        *self.inner.selected.write().await = Some(task.id.clone());
        Ok(task)
    }

    pub async fn clear_selection(&self) {
        *self.inner.selected.write().await = None;
    }

    /// Current snapshot of the selected task.
    pub async fn selected_task(&self) -> Option<Task> {
        let id = self.inner.selected.read().await.clone()?;
        self.inner.tasks.get(&id).await
    }

    /// Attach a 1-5 rating and comment to a task and push it to the
    /// spreadsheet in the background.
    pub async fn submit_feedback(
        &self,
        id: &str,
        rating: u8,
        comments: impl Into<String>,
    ) -> Result<Task, IntentError> {
        if !(1..=5).contains(&rating) {
            return Err(IntentError::InvalidRating(rating));
        }
        let feedback = ProjectFeedback {
            rating,
            comments: comments.into(),
            submitted_at: chrono::Utc::now(),
        };
        let task = self
            .inner
            .tasks
            .update(id, |t| t.feedback = Some(feedback.clone()))
            .await
            .ok_or_else(|| IntentError::TaskNotFound(id.to_string()))?;
        self.inner
            .logs
            .success(format!("Feedback recorded for {id}: {rating}/5"), Some(id))
            .await;

        let reporter = Arc::new(TaskObserver::new(
            id,
            self.inner.tasks.clone(),
            self.inner.logs.clone(),
        ));
        let sheet = self.inner.collab.spreadsheet.clone();
        let snapshot = task.clone();
        self.inner
            .side_effects
            .spawn("Spreadsheet sync", reporter, async move {
                sheet.sync(&snapshot, Some(&feedback)).await
            });
        Ok(task)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub async fn summary(&self) -> DashboardSummary {
        self.inner.tasks.summary().await
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.tasks.snapshot().await
    }

    pub async fn task(&self, id: &str) -> Option<Task> {
        self.inner.tasks.get(id).await
    }

    pub async fn agents(&self) -> Vec<AgentRecord> {
        self.inner.agents.snapshot().await
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.inner.logs.snapshot().await
    }

    pub async fn activity(&self) -> Vec<AutomationActivity> {
        self.inner.activity.activities().await
    }

    pub async fn chat(&self) -> Vec<ChatMessage> {
        self.inner.activity.chat().await
    }

    pub async fn metrics(&self) -> Option<CommerceMetrics> {
        self.inner.metrics.read().await.clone()
    }

    pub fn subscribe(&self) -> flume::Receiver<DashboardEvent> {
        self.inner.bus.subscribe()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
