//! Chief configuration stored at `<home>/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chief configuration (TOML).
///
/// Every field is optional in the file; missing fields fall back to the defaults
/// below, which reproduce the unconfigured behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ChiefConfig {
    pub agent: AgentConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent executable (looked up on `PATH`).
    pub command: String,

    /// Arguments appended to every invocation, before the prompt.
    pub extra_args: Vec<String>,

    /// Model for auxiliary prompts (worktree naming, plan breakdown).
    pub helper_model: Option<String>,

    /// Model for the pull-request prompt.
    pub pr_model: Option<String>,

    /// Captured agent output kept in memory and in iteration logs.
    pub output_limit_bytes: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            extra_args: vec!["--chrome".to_string()],
            helper_model: Some("sonnet".to_string()),
            pr_model: Some("sonnet".to_string()),
            output_limit_bytes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Stop the loop after this many iterations. `0` means unbounded.
    pub max_iterations: u32,

    /// Kill a captured agent invocation after this many seconds. `0` means no timeout.
    pub iteration_timeout_secs: u64,
}

impl RunConfig {
    pub fn max_iterations(&self) -> Option<u32> {
        (self.max_iterations > 0).then_some(self.max_iterations)
    }

    pub fn iteration_timeout(&self) -> Option<Duration> {
        (self.iteration_timeout_secs > 0).then(|| Duration::from_secs(self.iteration_timeout_secs))
    }
}

impl ChiefConfig {
    pub fn validate(&self) -> Result<()> {
        if self.agent.command.trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty string"));
        }
        if self.agent.output_limit_bytes == 0 {
            return Err(anyhow!("agent.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ChiefConfig::default()`.
pub fn load_config(path: &Path) -> Result<ChiefConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = ChiefConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ChiefConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ChiefConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
