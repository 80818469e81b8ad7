//! Per-task phase sequencing.
//!
//! A task goes Research -> CodeGen -> Test -> Deploy -> finalization. Every
//! external step is retry-wrapped; a step that exhausts its retries fails
//! the task, flips the active agents to `Error`, and returns control to the
//! scheduler.

use std::future::Future;
use std::sync::Arc;

use fm_core::activity::ActivityFeed;
use fm_core::agent_tracker::AgentTracker;
use fm_core::log_sink::LogSink;
use fm_core::task_store::TaskStore;
use fm_core::types::{AgentKind, AutomationEvent, ChatKind, Task, TaskStatus};
use fm_harness::best_effort::{self, BestEffortSet};
use fm_harness::retry::RetryPolicy;
use fm_integrations::{Collaborators, Generated, IntegrationError};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::observer::TaskObserver;

/// How a processed task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
}

#[derive(Clone)]
pub struct Pipeline {
    collab: Collaborators,
    tasks: TaskStore,
    agents: AgentTracker,
    logs: LogSink,
    activity: ActivityFeed,
    side_effects: BestEffortSet,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        collab: Collaborators,
        tasks: TaskStore,
        agents: AgentTracker,
        logs: LogSink,
        activity: ActivityFeed,
        side_effects: BestEffortSet,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            collab,
            tasks,
            agents,
            logs,
            activity,
            side_effects,
            retry,
        }
    }

    /// Drive `task` through every phase. Never returns an error: failures
    /// are recorded on the task itself.
    pub async fn run_task(&self, task: Task) -> TaskOutcome {
        info!(task_id = %task.id, priority = %task.priority, "task dequeued");
        self.logs
            .info(
                format!("Engaging lifecycle for [{}]: {}", task.priority, task.topic),
                Some(&task.id),
            )
            .await;

        let observer = Arc::new(TaskObserver::new(
            task.id.clone(),
            self.tasks.clone(),
            self.logs.clone(),
        ));

        match self.execute(&task, &observer).await {
            Ok(()) => TaskOutcome::Completed,
            Err(err) => {
                let message = err.to_string();
                self.fail(&task, &observer, &message).await;
                TaskOutcome::Failed(message)
            }
        }
    }

    /// Record `task` as failed without running it, for a run that ended
    /// abnormally (for example a panicking collaborator).
    pub async fn abandon(&self, task: &Task, reason: &str) -> TaskOutcome {
        let observer = Arc::new(TaskObserver::new(
            task.id.clone(),
            self.tasks.clone(),
            self.logs.clone(),
        ));
        self.fail(task, &observer, reason).await;
        TaskOutcome::Failed(reason.to_string())
    }

    async fn execute(&self, task: &Task, observer: &Arc<TaskObserver>) -> Result<()> {
        let id = task.id.as_str();
        let topic = task.topic.as_str();

        // -- Research ------------------------------------------------------
        self.agents.activate(AgentKind::Research, topic).await;
        self.update(id, |t| {
            // a re-queued failed task starts over
            t.progress = 0;
            t.advance(TaskStatus::Researching, 10);
        })
        .await?;

        let (research, infra) = tokio::join!(
            self.retried(observer, "Research", || {
                self.collab.researcher.conduct_research(topic)
            }),
            self.retried(observer, "Infra Provisioning", || {
                self.collab.infra.provision(task)
            }),
        );
        let research = research?;
        let infra = infra?;

        self.agents.complete(AgentKind::Research).await;
        self.update(id, |t| {
            t.research = Some(research.clone());
            t.infra = Some(infra.clone());
            t.advance(TaskStatus::Researching, 25);
        })
        .await?;
        self.logs
            .ai(
                format!(
                    "Research synthesized: {} key findings, {} sources",
                    research.key_findings.len(),
                    research.sources.len()
                ),
                Some(id),
            )
            .await;

        let infra_client = self.collab.infra.clone();
        let summary = research.summary.clone();
        self.side_effects.spawn("Research archival", observer.clone(), async move {
            infra_client.archive_research(&summary).await
        });

        // -- CodeGen -------------------------------------------------------
        self.agents
            .activate(AgentKind::CodeGen, format!("Architecting: {topic}"))
            .await;
        self.update(id, |t| t.advance(TaskStatus::GeneratingCode, 40)).await?;

        let code = self
            .retried(observer, "CodeGen", || {
                self.collab.code_generator.generate_code(topic, &research)
            })
            .await?;
        let code = self.accept(id, "CodeGen", code).await;

        self.agents.complete(AgentKind::CodeGen).await;
        self.update(id, |t| {
            t.code = Some(code.clone());
            t.advance(TaskStatus::GeneratingCode, 55);
        })
        .await?;

        // -- Test ----------------------------------------------------------
        self.agents
            .activate(AgentKind::Test, format!("Verifying: {topic}"))
            .await;
        self.update(id, |t| t.advance(TaskStatus::Testing, 65)).await?;

        let unit_tests = self
            .retried(observer, "Testing", || {
                self.collab
                    .test_generator
                    .generate_tests(topic, &research, &code)
            })
            .await?;
        let unit_tests = self.accept(id, "Testing", unit_tests).await;

        self.agents.complete(AgentKind::Test).await;
        self.update(id, |t| {
            t.unit_tests = Some(unit_tests.clone());
            t.advance(TaskStatus::Tested, 75);
        })
        .await?;

        // -- Deploy --------------------------------------------------------
        self.agents
            .activate(AgentKind::Deploy, format!("Shipping: {topic}"))
            .await;
        self.update(id, |t| t.advance(TaskStatus::Committing, 80)).await?;

        let commit_url = self
            .retried(observer, "GitHub Commit", || {
                self.collab.source_control.commit(task)
            })
            .await?;
        self.logs
            .success(
                format!("GitHub Commit (Branch feature/{id}): {commit_url}"),
                Some(id),
            )
            .await;

        let triangle = self.collab.triangle.clone();
        let outbound_id = id.to_string();
        self.side_effects.spawn("Triangle sync", observer.clone(), async move {
            triangle.notify_outbound(&outbound_id).await
        });

        self.update(id, |t| t.advance(TaskStatus::Deploying, 90)).await?;

        let (endpoints, commerce) = tokio::join!(
            self.retried(observer, "Deploy", || self.collab.deployer.trigger(task)),
            self.retried(observer, "Commerce Sync", || {
                self.collab.commerce.sync_task(task)
            }),
        );
        let endpoints = endpoints?;
        let commerce = commerce?;

        self.agents.complete(AgentKind::Deploy).await;
        debug!(task_id = id, firebase = %endpoints.firebase, replit = %endpoints.replit, "deployed");
        self.logs
            .success(
                format!("Commerce Command Center Updated: {}", commerce.product_id),
                Some(id),
            )
            .await;

        // -- Finalization --------------------------------------------------
        let mut final_task = self.tasks.get(id).await.unwrap_or_else(|| task.clone());
        final_task.research = Some(research);
        final_task.code = Some(code);
        final_task.unit_tests = Some(unit_tests);
        final_task.infra = Some(infra);
        final_task.commerce_update = Some(commerce);
        final_task.error = None;
        final_task.advance(TaskStatus::Completed, 100);

        self.finalize(&final_task, observer).await;

        self.update(id, |t| {
            t.research = final_task.research.clone();
            t.code = final_task.code.clone();
            t.unit_tests = final_task.unit_tests.clone();
            t.infra = final_task.infra.clone();
            t.commerce_update = final_task.commerce_update.clone();
            t.error = None;
            t.advance(TaskStatus::Completed, 100);
        })
        .await?;
        self.logs
            .success(format!("Full lifecycle finalized for {id}."), Some(id))
            .await;

        self.notify_chat(&final_task, ChatKind::Completion, observer);
        Ok(())
    }

    /// The four persistence/notification side effects of a completed task,
    /// run concurrently. Failures are reported and otherwise ignored.
    async fn finalize(&self, final_task: &Task, observer: &Arc<TaskObserver>) {
        let reporter = observer.as_ref();
        let archive_name = format!("{}_bundle.json", final_task.id);

        let tracker = best_effort::attempt(
            "Task tracker sync",
            reporter,
            self.collab.tracker.sync_task(final_task),
        );
        let spreadsheet = best_effort::attempt(
            "Spreadsheet sync",
            reporter,
            self.collab.spreadsheet.sync(final_task, None),
        );
        let automation = best_effort::attempt("Automation trigger", reporter, async {
            let activity = self
                .collab
                .automation
                .fire(final_task, AutomationEvent::Completion)
                .await?;
            self.activity.record_activity(activity).await;
            Ok::<_, IntegrationError>(())
        });
        let archive = best_effort::attempt("Secure archive", reporter, async {
            let payload = serde_json::to_value(final_task)
                .map_err(|e| IntegrationError::malformed("archive", e.to_string()))?;
            self.collab.archive.store(&archive_name, payload).await
        });

        let (_, _, _, reference) = tokio::join!(tracker, spreadsheet, automation, archive);
        if let Some(reference) = reference {
            debug!(task_id = %final_task.id, reference = %reference, "bundle archived");
        }
    }

    async fn fail(&self, task: &Task, observer: &Arc<TaskObserver>, message: &str) {
        warn!(task_id = %task.id, error = message, "task failed");
        let failed = self.tasks.update(&task.id, |t| t.fail(message)).await;
        self.logs
            .error(format!("Orchestration error: {message}"), Some(&task.id))
            .await;
        self.agents.fail_active().await;

        let snapshot = failed.unwrap_or_else(|| {
            let mut t = task.clone();
            t.fail(message);
            t
        });
        self.notify_chat(&snapshot, ChatKind::Alert, observer);
    }

    fn notify_chat(&self, task: &Task, kind: ChatKind, observer: &Arc<TaskObserver>) {
        let chat = self.collab.chat.clone();
        let activity = self.activity.clone();
        let task = task.clone();
        self.side_effects.spawn("Chat notification", observer.clone(), async move {
            let message = chat.post(&task, kind).await?;
            activity.record_chat(message).await;
            Ok::<_, IntegrationError>(())
        });
    }

    async fn retried<T, F, Fut>(
        &self,
        observer: &TaskObserver,
        operation: &'static str,
        f: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = fm_integrations::Result<T>>,
    {
        self.retry
            .run(operation, observer, f)
            .await
            .map_err(|source| PipelineError::Step { operation, source })
    }

    /// Unwrap a generator outcome, logging when a placeholder was used.
    async fn accept<T>(&self, task_id: &str, operation: &str, generated: Generated<T>) -> T {
        if let Some(reason) = generated.reason() {
            self.logs
                .warning(
                    format!("{operation} output unparseable, using placeholder ({reason})"),
                    Some(task_id),
                )
                .await;
        }
        generated.into_payload()
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        self.tasks
            .update(id, f)
            .await
            .ok_or_else(|| PipelineError::TaskNotFound(id.to_string()))
    }
}
