//! Canonical chief locations: the chief home and the `.chief/` directory of a worktree.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

/// Environment variable overriding the chief home directory.
pub const HOME_ENV: &str = "CHIEF_HOME";

/// Name of the per-repository and per-worktree chief directory.
pub const CHIEF_DIR: &str = ".chief";

/// The chief home (`$CHIEF_HOME` or `~/.chief`) and the layout below it.
///
/// ```text
/// <home>/config.toml
/// <home>/<project>/verification.txt
/// <home>/<project>/worktrees/<name>/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChiefHome {
    root: PathBuf,
}

impl ChiefHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve from `$CHIEF_HOME`, falling back to `~/.chief`.
    pub fn from_env() -> Result<Self> {
        if let Some(custom) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(custom)));
        }
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(Self::new(home.join(CHIEF_DIR)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.root.join(project)
    }

    pub fn worktrees_dir(&self, project: &str) -> PathBuf {
        self.project_dir(project).join("worktrees")
    }

    pub fn worktree_path(&self, project: &str, name: &str) -> PathBuf {
        self.worktrees_dir(project).join(name)
    }

    /// Project-level verification profile shared by all worktrees of a project.
    pub fn project_verification_path(&self, project: &str) -> PathBuf {
        self.project_dir(project).join("verification.txt")
    }
}

/// All canonical paths within a worktree's `.chief/` directory.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub chief_dir: PathBuf,
    pub plan_path: PathBuf,
    pub tasks_path: PathBuf,
    pub schema_path: PathBuf,
    pub verification_path: PathBuf,
    pub runs_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let chief_dir = root.join(CHIEF_DIR);
        Self {
            root: root.clone(),
            chief_dir: chief_dir.clone(),
            plan_path: chief_dir.join("plan.md"),
            tasks_path: chief_dir.join("tasks.json"),
            schema_path: chief_dir.join("tasks.schema.json"),
            verification_path: chief_dir.join("verification.txt"),
            runs_dir: chief_dir.join("runs"),
        }
    }
}
