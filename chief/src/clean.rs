//! `chief clean`: remove a worktree and its directory.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::io::git::Git;
use crate::io::terminal::Prompter;
use crate::io::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    Removed,
    /// The user declined the confirmation.
    Cancelled,
}

/// Remove `workspace` after confirmation (skipped with `assume_yes`).
///
/// Git removal runs from the main repository. If git refuses or the
/// worktree is already unknown to it, the directory is deleted directly and
/// stale worktree entries are pruned.
#[instrument(skip_all, fields(workspace = %workspace.name))]
pub fn clean_workspace<P: Prompter>(
    workspace: &Workspace,
    assume_yes: bool,
    prompter: &P,
) -> Result<CleanOutcome> {
    if !assume_yes {
        let question = format!(
            "\nAre you sure you want to delete worktree \"{}\"?",
            workspace.name
        );
        if !prompter.confirm(&question)? {
            println!("Cancelled.");
            return Ok(CleanOutcome::Cancelled);
        }
    }

    println!("\nDeleting worktree: {}", workspace.name);
    let main_repo = match Git::new(&workspace.path).main_repository_root() {
        Ok(root) => Some(Git::new(root)),
        Err(err) => {
            warn!(err = %err, "cannot resolve main repository");
            None
        }
    };

    if let Some(git) = &main_repo {
        if let Err(err) = git.remove_worktree(&workspace.path) {
            warn!(err = %err, "git worktree remove failed");
            println!("Note: Git worktree may have been removed already.");
        }
    }
    if workspace.path.exists() {
        fs::remove_dir_all(&workspace.path)
            .with_context(|| format!("remove {}", workspace.path.display()))?;
    }
    if let Some(git) = &main_repo {
        if let Err(err) = git.prune_worktrees() {
            warn!(err = %err, "git worktree prune failed");
        }
    }

    info!(path = %workspace.path.display(), "worktree removed");
    println!("\n✓ Worktree \"{}\" cleaned up successfully.", workspace.name);
    println!("\nYou can start a new project by running `chief new`.");
    Ok(CleanOutcome::Removed)
}
