//! `chief run`: drive the agent over a workspace's task list.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::io::agent::{Agent, AgentRequest};
use crate::io::config::ChiefConfig;
use crate::io::git::Git;
use crate::io::paths::{ChiefHome, WorkspacePaths};
use crate::io::prompt::render_run_prompt;
use crate::io::terminal::Prompter;
use crate::io::verification::{ProfileLocation, ensure_profile};
use crate::io::workspace::Workspace;
use crate::looping::{LoopOutcome, LoopSettings, LoopStop, run_loop};
use crate::publish::{PublishOutcome, publish};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Iterate until every task passes, then publish.
    Loop,
    /// One interactive agent session; no task check, no publish.
    Single,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Single { exit_code: Option<i32> },
    Completed {
        loop_outcome: LoopOutcome,
        publish: PublishOutcome,
    },
    /// The iteration limit stopped the loop with tasks pending.
    Incomplete(LoopOutcome),
}

/// Run the agent over `workspace`, acquiring the verification profile first if
/// none is stored yet.
#[instrument(skip_all, fields(workspace = %workspace.name, mode = ?mode))]
pub fn run_workspace<A: Agent, P: Prompter>(
    home: &ChiefHome,
    workspace: &Workspace,
    config: &ChiefConfig,
    mode: RunMode,
    agent: &A,
    prompter: &P,
) -> Result<RunOutcome> {
    let paths = WorkspacePaths::new(&workspace.path);
    let location = ProfileLocation {
        workspace_path: paths.verification_path.clone(),
        project_path: home.project_verification_path(&workspace.project),
    };
    let verification = ensure_profile(&location, &workspace.path, prompter)?;
    let prompt = render_run_prompt(&paths.plan_path, &paths.tasks_path, &verification)?;

    match mode {
        RunMode::Single => run_single(workspace, agent, prompt),
        RunMode::Loop => run_looping(workspace, config, agent, &prompt),
    }
}

fn run_single<A: Agent>(workspace: &Workspace, agent: &A, prompt: String) -> Result<RunOutcome> {
    println!("\nRunning single task in: {}", workspace.name);
    println!("(Interactive mode - exit when done)\n");

    let run = agent
        .interactive(&AgentRequest::new(&workspace.path, prompt))
        .context("run interactive agent session")?;
    info!(exit = %run.describe_exit(), "single run finished");
    println!("\n✓ Single run completed.");
    Ok(RunOutcome::Single {
        exit_code: run.exit_code,
    })
}

fn run_looping<A: Agent>(
    workspace: &Workspace,
    config: &ChiefConfig,
    agent: &A,
    prompt: &str,
) -> Result<RunOutcome> {
    println!("\nRunning tasks in loop mode: {}", workspace.name);
    println!("(Press Ctrl+C to stop)");

    let settings = LoopSettings::from_config(&config.run);
    let loop_outcome = run_loop(&workspace.path, agent, prompt, &settings, |report| {
        println!("\n[iteration {} log: {}]", report.iteration, report.log_path.display());
    })?;

    match loop_outcome.stop {
        LoopStop::IterationLimit { max_iterations } => {
            println!(
                "\nStopped after {max_iterations} iterations with tasks still pending. Run `chief run {}` to continue.",
                workspace.name
            );
            Ok(RunOutcome::Incomplete(loop_outcome))
        }
        LoopStop::Complete => {
            println!("\n✓ All tasks completed!");
            let git = Git::new(&workspace.path);
            let publish = publish(&git, agent, &workspace.path, config.agent.pr_model.as_deref())?;
            if let PublishOutcome::Pushed {
                pull_request_opened: true,
            } = publish
            {
                println!("\n✓ All done! Check the PR on GitHub.");
            }
            Ok(RunOutcome::Completed {
                loop_outcome,
                publish,
            })
        }
    }
}
