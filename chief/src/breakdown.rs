//! Plan-to-tasks conversion, shared by `chief new` and `chief tasks create`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::io::agent::{Agent, AgentRequest};
use crate::io::config::ChiefConfig;
use crate::io::paths::WorkspacePaths;
use crate::io::prompt::render_breakdown_prompt;
use crate::io::task_store::read_tasks;
use crate::io::workspace::Workspace;
use crate::task::Task;

/// Ask the agent to turn `.chief/plan.md` into `.chief/tasks.json`, then load
/// and validate the result.
///
/// A failed invocation is only logged; the written document decides.
#[instrument(skip_all, fields(name = %name))]
pub fn break_down_plan<A: Agent>(
    agent: &A,
    workspace_root: &Path,
    name: &str,
    model: Option<String>,
) -> Result<Vec<Task>> {
    let paths = WorkspacePaths::new(workspace_root);
    println!("\nConverting plan to tasks...");
    let request = AgentRequest::new(
        workspace_root,
        render_breakdown_prompt(&paths.plan_path, &paths.schema_path, &paths.tasks_path)?,
    )
    .with_model(model);
    let run = agent.captured(&request).context("run plan breakdown")?;
    if !run.succeeded() {
        warn!(exit = %run.describe_exit(), "breakdown invocation failed");
    }
    let tasks = read_tasks(workspace_root)?;
    if tasks.is_empty() {
        bail!(
            "No tasks were written to {}. Run `chief tasks create {name}` to try again.",
            paths.tasks_path.display()
        );
    }
    info!(count = tasks.len(), "tasks created");
    Ok(tasks)
}

/// Re-run the breakdown for an existing worktree that already has a plan.
pub fn create_tasks<A: Agent>(
    workspace: &Workspace,
    config: &ChiefConfig,
    agent: &A,
) -> Result<Vec<Task>> {
    let paths = WorkspacePaths::new(&workspace.path);
    if !paths.plan_path.is_file() {
        bail!(
            "Plan not found at {}. Create a plan.md file first or run `chief new` to start a new project.",
            paths.plan_path.display()
        );
    }
    if !paths.schema_path.is_file() {
        bail!(
            "Task schema not found at {}. Run `chief new` to set up the worktree properly.",
            paths.schema_path.display()
        );
    }
    let tasks = break_down_plan(
        agent,
        &workspace.path,
        &workspace.name,
        config.agent.helper_model.clone(),
    )?;
    print_next_steps(workspace, tasks.len());
    Ok(tasks)
}

pub fn print_next_steps(workspace: &Workspace, count: usize) {
    println!("\n✓ {count} tasks created successfully!");
    println!("  Worktree: {}", workspace.path.display());
    println!("\nNext steps:");
    println!("  chief tasks {}  - View the tasks", workspace.name);
    println!("  chief run {}    - Start working on tasks", workspace.name);
}
