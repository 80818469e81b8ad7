//! Plain-text renderings of orchestrator snapshots.

use fm_core::types::{AgentRecord, CommerceMetrics, DashboardSummary, LogEntry, Task};

pub fn summary(summary: &DashboardSummary, running: bool, metrics: Option<&CommerceMetrics>) -> String {
    let state = if running { "RUNNING" } else { "IDLE" };
    let rate = match summary.success_rate {
        Some(rate) => format!("{rate:.1}%"),
        None => "-".to_string(),
    };
    let mut out = format!(
        "{state} | total {} | completed {} | failed {} | in flight {} | pending {} | success {rate}",
        summary.total, summary.completed, summary.failed, summary.in_flight, summary.pending,
    );
    if let Some(m) = metrics {
        out.push_str(&format!(
            "\nsales {} | orders {} | conversion {}",
            m.sales, m.orders, m.conversion
        ));
    }
    out
}

pub fn task_line(task: &Task) -> String {
    let mut line = format!(
        "{:<10} {:<6} {:<15} {:>3}%  {}",
        task.id,
        task.priority.to_string(),
        task.status.label(),
        task.progress,
        task.topic
    );
    if task.retry_count > 0 {
        line.push_str(&format!("  (retries: {})", task.retry_count));
    }
    if let Some(error) = &task.error {
        line.push_str(&format!("  !! {error}"));
    }
    line
}

pub fn task_table(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "no tasks loaded".to_string();
    }
    tasks.iter().map(task_line).collect::<Vec<_>>().join("\n")
}

/// Everything known about one task, artifacts included.
pub fn task_detail(task: &Task) -> String {
    let mut lines = vec![task_line(task)];
    if let Some(research) = &task.research {
        lines.push(format!("research: {} finding(s)", research.key_findings.len()));
        for finding in &research.key_findings {
            lines.push(format!("  - {finding}"));
        }
    }
    if let Some(infra) = &task.infra {
        lines.push(format!("infra: {} / {}", infra.bucket, infra.function_arn));
    }
    if let Some(tests) = &task.unit_tests {
        lines.push(format!("tests: {}", tests.framework));
    }
    if let Some(commerce) = &task.commerce_update {
        lines.push(format!("commerce: {} ({})", commerce.product_id, commerce.sync_status));
    }
    if let Some(feedback) = &task.feedback {
        lines.push(format!("feedback: {}/5 {}", feedback.rating, feedback.comments));
    }
    lines.join("\n")
}

pub fn agent_table(agents: &[AgentRecord]) -> String {
    agents
        .iter()
        .map(|a| {
            format!(
                "{} {:<24} {:>3}%  {}",
                a.status.glyph(),
                a.name,
                a.progress,
                a.current_task
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn log_line(entry: &LogEntry) -> String {
    match &entry.task_id {
        Some(id) => format!("[{}] {:<5} [{id}] {}", entry.timestamp, entry.level, entry.message),
        None => format!("[{}] {:<5} {}", entry.timestamp, entry.level, entry.message),
    }
}

/// The newest `limit` entries, oldest first.
pub fn recent_logs(entries: &[LogEntry], limit: usize) -> String {
    let skip = entries.len().saturating_sub(limit);
    entries[skip..].iter().map(log_line).collect::<Vec<_>>().join("\n")
}
