use std::collections::VecDeque;

use fm_core::types::{Task, TaskStatus};

/// Ids of every task that still needs work, highest priority first.
///
/// The sort is stable, so tasks of equal priority keep their store order.
pub fn build_queue(tasks: &[Task]) -> VecDeque<String> {
    let mut pending: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Completed)
        .collect();
    pending.sort_by_key(|t| t.priority);
    pending.into_iter().map(|t| t.id.clone()).collect()
}
