//! Instruction text handed to the agent.
//!
//! Every prompt is a minijinja template embedded at compile time.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, Value, context};
use tracing::debug;

use crate::core::naming::MAX_NAME_LEN;

const RUN_TEMPLATE: &str = include_str!("prompts/run.md");
const PULL_REQUEST_TEMPLATE: &str = include_str!("prompts/pull_request.md");
const NAME_WORKTREE_TEMPLATE: &str = include_str!("prompts/name_worktree.md");
const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const BREAKDOWN_TEMPLATE: &str = include_str!("prompts/breakdown.md");

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [
            ("run", RUN_TEMPLATE),
            ("pull_request", PULL_REQUEST_TEMPLATE),
            ("name_worktree", NAME_WORKTREE_TEMPLATE),
            ("plan", PLAN_TEMPLATE),
            ("breakdown", BREAKDOWN_TEMPLATE),
        ] {
            env.add_template(name, source)
                .with_context(|| format!("compile {name} prompt"))?;
        }
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template
            .render(ctx)
            .with_context(|| format!("render {name} prompt"))?;
        debug!(template = name, bytes = rendered.len(), "prompt rendered");
        Ok(rendered)
    }
}

/// Instruction for one run iteration.
///
/// References the plan and task documents by `@path` and embeds the
/// verification steps as the acceptance gate.
pub fn render_run_prompt(plan_path: &Path, tasks_path: &Path, verification: &str) -> Result<String> {
    PromptEngine::new()?.render(
        "run",
        context! {
            plan_path => plan_path.display().to_string(),
            tasks_path => tasks_path.display().to_string(),
            verification => verification.trim(),
        },
    )
}

pub fn render_pull_request_prompt() -> Result<String> {
    PromptEngine::new()?.render("pull_request", context! {})
}

/// Ask the agent for a short worktree name describing `description`.
pub fn render_name_prompt(description: &str) -> Result<String> {
    PromptEngine::new()?.render(
        "name_worktree",
        context! {
            description => description.trim(),
            max_len => MAX_NAME_LEN,
        },
    )
}

/// Interactive planning session that ends with the plan written to `plan_path`.
pub fn render_plan_prompt(description: &str, plan_path: &Path) -> Result<String> {
    PromptEngine::new()?.render(
        "plan",
        context! {
            description => description.trim(),
            plan_path => plan_path.display().to_string(),
        },
    )
}

/// Convert the plan into a task document conforming to the schema.
pub fn render_breakdown_prompt(
    plan_path: &Path,
    schema_path: &Path,
    tasks_path: &Path,
) -> Result<String> {
    PromptEngine::new()?.render(
        "breakdown",
        context! {
            plan_path => plan_path.display().to_string(),
            schema_path => schema_path.display().to_string(),
            tasks_path => tasks_path.display().to_string(),
        },
    )
}
