//! Publish step: push the finished branch and have the agent open a pull request.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::io::agent::{Agent, AgentRequest};
use crate::io::git::Git;
use crate::io::prompt::render_pull_request_prompt;

/// Result of [`publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The branch is already up to date with its upstream.
    NothingToPublish,
    /// The branch was pushed; the pull-request invocation may have failed.
    Pushed { pull_request_opened: bool },
}

/// Push the workspace branch and ask the agent to open a pull request.
///
/// Skipped when git reports nothing unpublished. A failed push is an error; a
/// failed pull-request invocation is only reported and leaves the push in place.
#[instrument(skip_all, fields(workspace = %workspace.display()))]
pub fn publish<A: Agent>(
    git: &Git,
    agent: &A,
    workspace: &Path,
    pr_model: Option<&str>,
) -> Result<PublishOutcome> {
    if !git.has_unpublished_commits() {
        info!("nothing to publish");
        println!("\nNo unpublished commits; skipping push and pull request.");
        return Ok(PublishOutcome::NothingToPublish);
    }

    println!("\nPushing branch to origin...");
    git.push_current_branch().context("push branch")?;

    println!("\nCreating pull request...");
    let prompt = render_pull_request_prompt()?;
    let request = AgentRequest::new(workspace, prompt).with_model(pr_model.map(str::to_string));
    let pull_request_opened = match agent.captured(&request) {
        Ok(run) if run.succeeded() => true,
        Ok(run) => {
            warn!(exit = %run.describe_exit(), "pull request invocation failed");
            println!("Pull request creation failed ({}).", run.describe_exit());
            false
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "pull request invocation could not start");
            println!("Pull request creation failed: {err:#}");
            false
        }
    };
    Ok(PublishOutcome::Pushed {
        pull_request_opened,
    })
}
