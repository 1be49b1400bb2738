//! Completion statistics over a task document.

use crate::task::Task;

/// Completed vs. total task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub completed: usize,
    pub total: usize,
}

impl TaskStats {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}

/// True iff at least one task has `passes == false`.
pub fn has_pending_tasks(tasks: &[Task]) -> bool {
    tasks.iter().any(|task| !task.passes)
}

pub fn task_stats(tasks: &[Task]) -> TaskStats {
    let completed = tasks.iter().filter(|task| task.passes).count();
    TaskStats {
        completed,
        total: tasks.len(),
    }
}
