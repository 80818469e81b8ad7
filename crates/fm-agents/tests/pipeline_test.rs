mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{assert_terminal_invariants, orchestrator, run_to_completion, task, Mock};
use fm_core::event_bus::DashboardEvent;
use fm_core::types::{AgentKind, AgentStatus, ChatKind, LogLevel, TaskPriority, TaskStatus};
use fm_integrations::generation::placeholder_code;
use fm_integrations::simulated::COMMIT_FAILURE_MESSAGE;

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn three_tasks_run_in_priority_order_to_completion() {
    let mock = Mock::new(vec![
        task("c", "C", TaskPriority::Low),
        task("a", "A", TaskPriority::High),
        task("b", "B", TaskPriority::Medium),
    ]);
    let (orch, mock) = orchestrator(mock).await;

    run_to_completion(&orch).await;

    assert_eq!(mock.research_order(), ["A", "B", "C"]);
    let tasks = orch.tasks().await;
    for t in &tasks {
        assert_eq!(t.status, TaskStatus::Completed, "{}", t.id);
        assert_eq!(t.progress, 100);
        assert_eq!(t.retry_count, 0);
        assert!(t.error.is_none());
    }
    assert_terminal_invariants(&tasks);
    assert!(!orch.is_running().await);

    let logs = orch.logs().await;
    let batch: Vec<usize> = logs
        .iter()
        .enumerate()
        .filter(|(_, e)| e.message == "Batch orchestration complete.")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(batch.len(), 1);
    let last_finalized = logs
        .iter()
        .position(|e| e.message == "Full lifecycle finalized for c.")
        .unwrap();
    assert!(batch[0] > last_finalized);

    let summary = orch.summary().await;
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn completion_records_automation_and_chat() {
    let (orch, _) = orchestrator(Mock::new(vec![task("a", "A", TaskPriority::High)])).await;

    run_to_completion(&orch).await;

    let activity = orch.activity().await;
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].name, "COMPLETION: A");
    let chat = orch.chat().await;
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].kind, ChatKind::Completion);
}

#[tokio::test(start_paused = true)]
async fn only_one_task_is_ever_in_flight() {
    let mock = Mock::new(vec![
        task("t1", "one", TaskPriority::Medium),
        task("t2", "two", TaskPriority::High),
        task("t3", "three", TaskPriority::Low),
        task("t4", "four", TaskPriority::High),
    ])
    .failing_commit("t4")
    .with_step_delay(Duration::from_millis(250));
    let (orch, _) = orchestrator(mock).await;
    let rx = orch.subscribe();

    run_to_completion(&orch).await;

    let mut statuses = HashMap::new();
    let mut seen = 0;
    for event in rx.try_iter() {
        if let DashboardEvent::TaskUpdated(t) = event {
            statuses.insert(t.id.clone(), t.status);
            let in_flight = statuses.values().filter(|s| s.is_in_flight()).count();
            assert!(in_flight <= 1, "{in_flight} tasks in flight after {}", t.id);
            seen += 1;
        }
    }
    assert!(seen > 0);
    assert_terminal_invariants(&orch.tasks().await);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn exhausted_commit_fails_task_and_batch_continues() {
    let mock = Mock::new(vec![
        task("x", "X", TaskPriority::High),
        task("y", "Y", TaskPriority::Medium),
    ])
    .failing_commit("x");
    let (orch, mock) = orchestrator(mock).await;
    let rx = orch.subscribe();

    run_to_completion(&orch).await;

    let x = orch.task("x").await.unwrap();
    assert_eq!(x.status, TaskStatus::Failed);
    assert_eq!(x.retry_count, 3);
    assert!(x.error.as_deref().unwrap().contains(COMMIT_FAILURE_MESSAGE));

    let y = orch.task("y").await.unwrap();
    assert_eq!(y.status, TaskStatus::Completed);
    assert_eq!(mock.research_order(), ["X", "Y"]);

    let deploy_errored = rx.try_iter().any(|event| {
        matches!(
            event,
            DashboardEvent::AgentUpdated(ref a)
                if a.kind == AgentKind::Deploy && a.status == AgentStatus::Error
        )
    });
    assert!(deploy_errored);

    let logs = orch.logs().await;
    let commit_errors: Vec<_> = logs
        .iter()
        .filter(|e| e.level == LogLevel::Error && e.message.starts_with("GitHub Commit failed"))
        .collect();
    assert_eq!(commit_errors.len(), 4);
    assert!(commit_errors[3].message.ends_with(COMMIT_FAILURE_MESSAGE));
    assert!(logs
        .iter()
        .any(|e| e.message.starts_with("Orchestration error:") && e.task_id.as_deref() == Some("x")));

    let alerts = orch
        .chat()
        .await
        .into_iter()
        .filter(|m| m.kind == ChatKind::Alert)
        .count();
    assert_eq!(alerts, 1);
    assert_terminal_invariants(&orch.tasks().await);
}

#[tokio::test(start_paused = true)]
async fn transient_commit_failures_are_retried() {
    let mock = Mock::new(vec![task("t1", "one", TaskPriority::High)]).flaky_commit("t1", 2);
    let (orch, _) = orchestrator(mock).await;

    run_to_completion(&orch).await;

    let t1 = orch.task("t1").await.unwrap();
    assert_eq!(t1.status, TaskStatus::Completed);
    assert_eq!(t1.retry_count, 2);
    let retries: Vec<_> = orch
        .logs()
        .await
        .into_iter()
        .filter(|e| e.level == LogLevel::Warning && e.message.starts_with("Retrying GitHub Commit"))
        .map(|e| e.message)
        .collect();
    assert_eq!(
        retries,
        ["Retrying GitHub Commit (1/3)", "Retrying GitHub Commit (2/3)"]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_generator_output_degrades_to_placeholder() {
    let mock = Mock::new(vec![task("t1", "one", TaskPriority::High)]).degraded_generators();
    let (orch, _) = orchestrator(mock).await;

    run_to_completion(&orch).await;

    let t1 = orch.task("t1").await.unwrap();
    assert_eq!(t1.status, TaskStatus::Completed);
    assert_eq!(t1.code, Some(placeholder_code()));
    assert!(orch.logs().await.iter().any(|e| {
        e.level == LogLevel::Warning && e.message.starts_with("CodeGen output unparseable")
    }));
}

#[tokio::test(start_paused = true)]
async fn archive_failure_does_not_fail_task() {
    let mock = Mock::new(vec![task("t1", "one", TaskPriority::High)]).failing_archive();
    let (orch, _) = orchestrator(mock).await;

    run_to_completion(&orch).await;

    let t1 = orch.task("t1").await.unwrap();
    assert_eq!(t1.status, TaskStatus::Completed);
    let skipped = "Secure archive skipped: archive unavailable: quota exceeded";
    assert!(orch
        .logs()
        .await
        .iter()
        .any(|e| e.level == LogLevel::Warning && e.message == skipped));
}

#[tokio::test(start_paused = true)]
async fn infra_failure_fails_task_without_storing_research() {
    let mock = Mock::new(vec![task("t1", "one", TaskPriority::High)]).failing_infra();
    let (orch, _) = orchestrator(mock).await;
    let rx = orch.subscribe();

    run_to_completion(&orch).await;

    let t1 = orch.task("t1").await.unwrap();
    assert_eq!(t1.status, TaskStatus::Failed);
    assert_eq!(
        t1.error.as_deref(),
        Some("Infra Provisioning failed: infra unavailable: region capacity exhausted")
    );
    assert!(t1.research.is_none());
    assert!(t1.infra.is_none());

    let research_errored = rx.try_iter().any(|event| {
        matches!(
            event,
            DashboardEvent::AgentUpdated(ref a)
                if a.kind == AgentKind::Research && a.status == AgentStatus::Error
        )
    });
    assert!(research_errored);
    assert_terminal_invariants(&orch.tasks().await);
}

#[tokio::test(start_paused = true)]
async fn commerce_failure_fails_task_at_deploy() {
    let mock = Mock::new(vec![task("t1", "one", TaskPriority::High)]).failing_commerce();
    let (orch, _) = orchestrator(mock).await;
    let rx = orch.subscribe();

    run_to_completion(&orch).await;

    let t1 = orch.task("t1").await.unwrap();
    assert_eq!(t1.status, TaskStatus::Failed);
    assert!(t1
        .error
        .as_deref()
        .unwrap()
        .starts_with("Commerce Sync failed: product handle taken"));
    assert!(t1.commerce_update.is_none());
    assert_eq!(t1.progress, 90);

    let deploy_errored = rx.try_iter().any(|event| {
        matches!(
            event,
            DashboardEvent::AgentUpdated(ref a)
                if a.kind == AgentKind::Deploy && a.status == AgentStatus::Error
        )
    });
    assert!(deploy_errored);
}

#[tokio::test(start_paused = true)]
async fn background_sync_failures_do_not_fail_task() {
    let mock = Mock::new(vec![task("t1", "one", TaskPriority::High)])
        .failing_archival()
        .failing_outbound();
    let (orch, _) = orchestrator(mock).await;

    run_to_completion(&orch).await;

    assert_eq!(orch.task("t1").await.unwrap().status, TaskStatus::Completed);
    let warnings: Vec<_> = orch
        .logs()
        .await
        .into_iter()
        .filter(|e| e.level == LogLevel::Warning && e.task_id.as_deref() == Some("t1"))
        .map(|e| e.message)
        .collect();
    assert!(warnings
        .iter()
        .any(|m| m == "Research archival skipped: reader unavailable: sync refused"));
    assert!(warnings
        .iter()
        .any(|m| m == "Triangle sync skipped: triangle unavailable: coordinator offline"));
}

#[tokio::test(start_paused = true)]
async fn failed_tasks_are_requeued_on_next_start() {
    let mock = Mock::new(vec![task("x", "X", TaskPriority::High)]).failing_commit("x");
    let (orch, mock) = orchestrator(mock).await;

    run_to_completion(&orch).await;
    assert_eq!(orch.task("x").await.unwrap().status, TaskStatus::Failed);

    run_to_completion(&orch).await;
    assert_eq!(mock.research_order(), ["X", "X"]);
    let x = orch.task("x").await.unwrap();
    assert_eq!(x.status, TaskStatus::Failed);
    assert_eq!(x.progress, 80);
}
