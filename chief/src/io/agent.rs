//! Agent abstraction for invoking the external coding agent.
//!
//! The [`Agent`] trait decouples the run loop from the actual agent backend
//! (the `claude` CLI by default). Tests use scripted agents that record requests
//! and mutate the workspace without spawning processes.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::io::config::AgentConfig;
use crate::io::process::{run_captured, run_interactive};

/// Permission mode handed to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Read-only planning; the agent may only write its plan.
    Plan,
    /// The agent may edit files without asking.
    AcceptEdits,
}

impl PermissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::AcceptEdits => "acceptEdits",
        }
    }
}

/// Parameters for an agent invocation.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Working directory for the agent process.
    pub workdir: PathBuf,
    /// Instruction text.
    pub prompt: String,
    pub permission: PermissionMode,
    /// Model override; `None` lets the agent choose.
    pub model: Option<String>,
    /// Kill a captured invocation after this long. Ignored for interactive runs.
    pub timeout: Option<Duration>,
    /// Echo captured output to stdout as it arrives.
    pub echo: bool,
}

impl AgentRequest {
    pub fn new(workdir: impl Into<PathBuf>, prompt: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            prompt: prompt.into(),
            permission: PermissionMode::AcceptEdits,
            model: None,
            timeout: None,
            echo: true,
        }
    }

    pub fn with_permission(mut self, permission: PermissionMode) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }
}

/// Result of one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRun {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout (empty for interactive runs).
    pub output: String,
    /// Bytes of stdout dropped beyond the configured limit.
    pub output_truncated: usize,
    pub timed_out: bool,
}

impl AgentRun {
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Short human description of how the process ended.
    pub fn describe_exit(&self) -> String {
        if self.timed_out {
            return "timed out".to_string();
        }
        match self.exit_code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Abstraction over agent backends.
///
/// `Err` means the agent could not be run at all (e.g. spawn failure). A run
/// that started and exited non-zero is an `Ok` with `succeeded() == false`.
pub trait Agent {
    /// Hand the terminal to the agent and wait until the user exits it.
    fn interactive(&self, request: &AgentRequest) -> Result<AgentRun>;

    /// Run the agent non-interactively and capture its stdout.
    fn captured(&self, request: &AgentRequest) -> Result<AgentRun>;
}

/// Agent that spawns the `claude` CLI (or the configured command).
#[derive(Debug, Clone)]
pub struct ClaudeAgent {
    config: AgentConfig,
}

impl ClaudeAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    fn command(&self, request: &AgentRequest, print: bool) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(agent_args(&self.config, request, print))
            .current_dir(&request.workdir);
        cmd
    }
}

impl Agent for ClaudeAgent {
    #[instrument(skip_all, fields(permission = request.permission.as_str()))]
    fn interactive(&self, request: &AgentRequest) -> Result<AgentRun> {
        info!(workdir = %request.workdir.display(), "starting interactive agent");
        let status = run_interactive(self.command(request, false))
            .with_context(|| format!("run {} interactively", self.config.command))?;
        debug!(exit_code = ?status.code(), "interactive agent exited");
        Ok(AgentRun {
            exit_code: status.code(),
            output: String::new(),
            output_truncated: 0,
            timed_out: false,
        })
    }

    #[instrument(skip_all, fields(permission = request.permission.as_str(), timeout_secs = request.timeout.map(|t| t.as_secs())))]
    fn captured(&self, request: &AgentRequest) -> Result<AgentRun> {
        info!(workdir = %request.workdir.display(), "starting captured agent");
        let cmd = self.command(request, true);
        let limit = self.config.output_limit_bytes;
        let output = if request.echo {
            run_captured(cmd, request.timeout, limit, std::io::stdout())
        } else {
            run_captured(cmd, request.timeout, limit, std::io::sink())
        }
        .with_context(|| format!("run {} -p", self.config.command))?;

        if output.timed_out {
            warn!("agent timed out");
        } else if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "agent exited unsuccessfully");
        }
        Ok(AgentRun {
            exit_code: output.status.code(),
            output: output.stdout_lossy(),
            output_truncated: output.stdout_truncated,
            timed_out: output.timed_out,
        })
    }
}

/// Command-line arguments for one invocation; the prompt is always last.
fn agent_args(config: &AgentConfig, request: &AgentRequest, print: bool) -> Vec<String> {
    let mut args = Vec::new();
    if request.permission == PermissionMode::Plan {
        args.push("--allowed-tools".to_string());
        args.push("Edit, Write".to_string());
    }
    args.push("--permission-mode".to_string());
    args.push(request.permission.as_str().to_string());
    if print {
        args.push("-p".to_string());
    }
    if let Some(model) = &request.model {
        args.push("--model".to_string());
        args.push(model.clone());
    }
    args.extend(config.extra_args.iter().cloned());
    args.push(request.prompt.clone());
    args
}
