//! Git adapter for chief commands.
//!
//! Chief never implements version control itself. Everything it needs from git
//! (repository discovery, worktrees, push, ahead-count) goes through this small,
//! explicit wrapper around `git` subprocess calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// True if `workdir` is inside a git work tree. Never errors.
    pub fn is_inside_work_tree(&self) -> bool {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(out) => out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true",
            Err(err) => {
                debug!(err = %err, "git rev-parse failed");
                false
            }
        }
    }

    /// Absolute path of the top-level directory of the current work tree.
    pub fn toplevel(&self) -> Result<PathBuf> {
        let out = self.run_capture(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Root of the main repository, even when `workdir` is a linked worktree.
    pub fn main_repository_root(&self) -> Result<PathBuf> {
        let out = self.run_capture(&["rev-parse", "--path-format=absolute", "--git-common-dir"])?;
        let common_dir = PathBuf::from(out.trim());
        common_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("git common dir has no parent: {}", common_dir.display()))
    }

    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["branch", "--show-current"])?;
        let name = out.trim().to_string();
        if name.is_empty() {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD (no current branch)"));
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Create a linked worktree at `path` on a new branch `branch` from HEAD.
    #[instrument(skip_all, fields(path = %path.display(), branch))]
    pub fn add_worktree(&self, path: &Path, branch: &str) -> Result<()> {
        let path_arg = path.to_string_lossy();
        debug!("adding worktree");
        self.run_checked(&["worktree", "add", path_arg.as_ref(), "-b", branch])?;
        Ok(())
    }

    /// Force-remove a linked worktree.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn remove_worktree(&self, path: &Path) -> Result<()> {
        let path_arg = path.to_string_lossy();
        debug!("removing worktree");
        self.run_checked(&["worktree", "remove", path_arg.as_ref(), "--force"])?;
        Ok(())
    }

    /// Drop administrative entries of worktrees whose directories are gone.
    pub fn prune_worktrees(&self) -> Result<()> {
        self.run_checked(&["worktree", "prune"])?;
        Ok(())
    }

    /// Push HEAD to `origin`, setting the upstream.
    #[instrument(skip_all)]
    pub fn push_current_branch(&self) -> Result<()> {
        debug!("pushing HEAD to origin");
        self.run_checked(&["push", "-u", "origin", "HEAD"])?;
        Ok(())
    }

    /// True if the current branch has a configured upstream.
    pub fn has_upstream(&self) -> Result<bool> {
        let out = self.run(&["rev-parse", "--verify", "--quiet", "@{u}"])?;
        Ok(out.status.success())
    }

    /// Number of commits on HEAD that are not on the upstream.
    pub fn ahead_count(&self) -> Result<u32> {
        let out = self.run_capture(&["rev-list", "@{u}..HEAD", "--count"])?;
        out.trim()
            .parse::<u32>()
            .with_context(|| format!("parse ahead count '{}'", out.trim()))
    }

    /// True if the current branch has commits that its upstream lacks.
    ///
    /// A branch without upstream counts as unpublished. Any git failure also
    /// answers `true`: attempting a push is cheaper than silently losing work.
    #[instrument(skip_all)]
    pub fn has_unpublished_commits(&self) -> bool {
        match self.has_upstream() {
            Ok(true) => {}
            Ok(false) => {
                debug!("no upstream configured");
                return true;
            }
            Err(err) => {
                warn!(err = %err, "upstream check failed, assuming unpublished commits");
                return true;
            }
        }
        match self.ahead_count() {
            Ok(count) => {
                debug!(ahead = count, "ahead of upstream");
                count > 0
            }
            Err(err) => {
                warn!(err = %err, "ahead count failed, assuming unpublished commits");
                true
            }
        }
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}
