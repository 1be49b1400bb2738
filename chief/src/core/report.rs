//! Plain-text listings for `chief tasks` and `chief worktrees`.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::core::stats::{TaskStats, task_stats};
use crate::task::Task;

/// Descriptions longer than this are cut with an ellipsis.
pub const MAX_DESCRIPTION_LEN: usize = 60;
const RULE_WIDTH: usize = 80;

pub fn truncate_description(description: &str, max_len: usize) -> String {
    if description.chars().count() <= max_len {
        return description.to_string();
    }
    let kept: String = description.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Task list with progress, one entry per task.
pub fn render_task_list(worktree: &str, tasks: &[Task]) -> String {
    let mut out = String::new();
    if tasks.is_empty() {
        let _ = writeln!(out, "\nNo tasks found in {worktree}");
        let _ = writeln!(out, "Run `chief tasks create {worktree}` to convert its plan into tasks.");
        return out;
    }

    let stats = task_stats(tasks);
    let rule = "─".repeat(RULE_WIDTH);
    let _ = writeln!(out, "\nTasks for: {worktree}");
    let _ = writeln!(out, "Progress: {}/{} completed\n", stats.completed, stats.total);
    let _ = writeln!(out, "{rule}");
    for (idx, task) in tasks.iter().enumerate() {
        let glyph = if task.passes { "✓" } else { "○" };
        let _ = writeln!(
            out,
            "{glyph} [{}] {}: {}",
            idx + 1,
            task.category,
            truncate_description(&task.description, MAX_DESCRIPTION_LEN)
        );
        let _ = writeln!(out, "     Steps: {}", task.steps.len());
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "\n{} tasks remaining", stats.remaining());
    if stats.remaining() > 0 {
        let _ = writeln!(out, "\nRun `chief run` to start working on tasks.");
    } else {
        let _ = writeln!(out, "\nAll tasks completed! Run `chief clean` to clean up.");
    }
    out
}

/// Task progress of one worktree as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Tasks(TaskStats),
    NoTasks,
    /// The task document exists but could not be read.
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeSummary {
    pub name: String,
    /// Creation date, already formatted.
    pub created: String,
    pub path: PathBuf,
    pub progress: Progress,
}

pub fn render_worktree_list(worktrees: &[WorktreeSummary]) -> String {
    let mut out = String::new();
    if worktrees.is_empty() {
        let _ = writeln!(out, "\nNo worktrees found.");
        let _ = writeln!(out, "Run `chief new` to create one.");
        return out;
    }

    let rule = "─".repeat(RULE_WIDTH);
    let _ = writeln!(out, "\nWorktrees:\n");
    let _ = writeln!(out, "{rule}");
    for wt in worktrees {
        let progress = match &wt.progress {
            Progress::Tasks(stats) => format!("  Tasks: {}/{}", stats.completed, stats.total),
            Progress::NoTasks => String::new(),
            Progress::Unreadable => "  Tasks: unreadable".to_string(),
        };
        let _ = writeln!(out, "{}", wt.name);
        let _ = writeln!(out, "  Created: {}{progress}", wt.created);
        let _ = writeln!(out, "  Path: {}\n", wt.path.display());
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "\n{} worktree(s) total", worktrees.len());
    let _ = writeln!(out, "\nUse `chief run <name>` to work on a worktree.");
    out
}
