//! Iteration logging helpers for `.chief/runs/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::io::agent::AgentRun;
use crate::io::paths::WorkspacePaths;

/// Directory holding the logs of one loop run.
#[derive(Debug, Clone)]
pub struct RunLogDir {
    pub dir: PathBuf,
}

impl RunLogDir {
    /// Create `<workspace>/.chief/runs/<YYYYMMDD-HHMMSS>/`.
    pub fn create(workspace_root: &Path) -> Result<Self> {
        let run_id = Local::now().format("%Y%m%d-%H%M%S").to_string();
        Self::create_named(workspace_root, &run_id)
    }

    pub fn create_named(workspace_root: &Path, run_id: &str) -> Result<Self> {
        let dir = WorkspacePaths::new(workspace_root).runs_dir.join(run_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create run log dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn iteration_path(&self, iter: u32) -> PathBuf {
        self.dir.join(format!("iteration-{iter}.log"))
    }

    /// Write the captured output and exit status of iteration `iter`.
    pub fn write_iteration(&self, iter: u32, run: &AgentRun) -> Result<PathBuf> {
        let path = self.iteration_path(iter);
        let mut buf = run.output.clone();
        if !buf.is_empty() && !buf.ends_with('\n') {
            buf.push('\n');
        }
        if run.output_truncated > 0 {
            buf.push_str(&format!(
                "[agent stdout truncated {} bytes]\n",
                run.output_truncated
            ));
        }
        buf.push_str(&format!("--- {} ---\n", run.describe_exit()));
        fs::write(&path, buf).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
