//! The run loop: invoke the agent once per iteration until no task is pending.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::stats::{TaskStats, has_pending_tasks, task_stats};
use crate::io::agent::{Agent, AgentRequest, AgentRun};
use crate::io::config::RunConfig;
use crate::io::iteration_log::RunLogDir;
use crate::io::task_store::read_tasks;

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// Every task passes (or the document has no tasks).
    Complete,
    /// The configured `max_iterations` was reached with tasks still pending.
    IterationLimit { max_iterations: u32 },
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub iterations: u32,
    pub stop: LoopStop,
}

/// Optional guards on the loop; both default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSettings {
    pub max_iterations: Option<u32>,
    pub iteration_timeout: Option<Duration>,
}

impl LoopSettings {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            max_iterations: cfg.max_iterations(),
            iteration_timeout: cfg.iteration_timeout(),
        }
    }
}

/// What one iteration did.
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: u32,
    /// Task progress read before the agent ran.
    pub stats_before: TaskStats,
    pub run: AgentRun,
    pub log_path: PathBuf,
}

/// Invoke the agent with `prompt` until the task document has nothing pending.
///
/// The task document is re-read at the head of every iteration; the agent's
/// exit is the only synchronization point. A non-zero exit is reported and the
/// loop continues. A corrupt task document or an agent that cannot be spawned
/// stops the loop with an error.
#[instrument(skip_all, fields(root = %root.display(), max_iterations = ?settings.max_iterations))]
pub fn run_loop<A: Agent, F: FnMut(&IterationReport)>(
    root: &Path,
    agent: &A,
    prompt: &str,
    settings: &LoopSettings,
    mut on_iteration: F,
) -> Result<LoopOutcome> {
    let mut logs: Option<RunLogDir> = None;
    let mut iterations = 0u32;
    loop {
        let tasks = read_tasks(root)?;
        if !has_pending_tasks(&tasks) {
            info!(iterations, "all tasks pass");
            return Ok(LoopOutcome {
                iterations,
                stop: LoopStop::Complete,
            });
        }
        if let Some(max_iterations) = settings.max_iterations {
            if iterations >= max_iterations {
                warn!(max_iterations, "iteration limit reached with tasks pending");
                return Ok(LoopOutcome {
                    iterations,
                    stop: LoopStop::IterationLimit { max_iterations },
                });
            }
        }

        let stats_before = task_stats(&tasks);
        iterations += 1;
        println!(
            "\n--- Iteration {iterations} ({} of {} tasks remaining) ---\n",
            stats_before.remaining(),
            stats_before.total
        );

        let request = AgentRequest::new(root, prompt).with_timeout(settings.iteration_timeout);
        let run = agent
            .captured(&request)
            .with_context(|| format!("run agent for iteration {iterations}"))?;
        if !run.succeeded() {
            warn!(iteration = iterations, exit = %run.describe_exit(), "agent iteration failed");
            println!(
                "\nAgent {} on iteration {iterations}; continuing.",
                run.describe_exit()
            );
        }

        let log_dir = match &mut logs {
            Some(existing) => existing,
            slot => slot.insert(RunLogDir::create(root)?),
        };
        let log_path = log_dir.write_iteration(iterations, &run)?;

        on_iteration(&IterationReport {
            iteration: iterations,
            stats_before,
            run,
            log_path,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        CallKind, ScriptedAgent, agent_run, pass_all_tasks, tasks_with_passes, write_tasks,
    };

    #[test]
    fn stops_after_the_iteration_that_completes_the_last_task() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().to_path_buf();
        write_tasks(&root, &tasks_with_passes(&[true, false])).expect("write tasks");

        let workspace = root.clone();
        let agent = ScriptedAgent::new().on_captured(move |_| {
            pass_all_tasks(&workspace)?;
            Ok(agent_run(Some(0), "done\n"))
        });

        let mut reports = Vec::new();
        let outcome = run_loop(&root, &agent, "prompt", &LoopSettings::default(), |r| {
            reports.push(r.clone());
        })
        .expect("loop");

        assert_eq!(
            outcome,
            LoopOutcome {
                iterations: 1,
                stop: LoopStop::Complete
            }
        );
        assert_eq!(agent.count(CallKind::Captured), 1);
        assert_eq!(agent.count(CallKind::Interactive), 0);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stats_before.remaining(), 1);
        assert!(reports[0].log_path.is_file());
    }

    #[test]
    fn requests_run_in_the_workspace_with_the_prompt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().to_path_buf();
        write_tasks(&root, &tasks_with_passes(&[false])).expect("write tasks");
        let workspace = root.clone();
        let agent = ScriptedAgent::new().on_captured(move |_| {
            pass_all_tasks(&workspace)?;
            Ok(agent_run(Some(0), ""))
        });

        let settings = LoopSettings {
            max_iterations: None,
            iteration_timeout: Some(Duration::from_secs(90)),
        };
        run_loop(&root, &agent, "do one task", &settings, |_| {}).expect("loop");

        let calls = agent.calls();
        assert_eq!(calls[0].request.workdir, root);
        assert_eq!(calls[0].request.prompt, "do one task");
        assert_eq!(calls[0].request.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn empty_or_missing_document_runs_no_iterations() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = ScriptedAgent::new();

        let outcome = run_loop(temp.path(), &agent, "p", &LoopSettings::default(), |_| {})
            .expect("loop");
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.stop, LoopStop::Complete);

        write_tasks(temp.path(), &[]).expect("write tasks");
        let outcome = run_loop(temp.path(), &agent, "p", &LoopSettings::default(), |_| {})
            .expect("loop");
        assert_eq!(outcome.iterations, 0);
        assert!(agent.calls().is_empty());
        assert!(!temp.path().join(".chief/runs").exists());
    }

    #[test]
    fn failed_iteration_is_reported_and_the_loop_continues() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().to_path_buf();
        write_tasks(&root, &tasks_with_passes(&[false])).expect("write tasks");

        let workspace = root.clone();
        let agent = ScriptedAgent::new()
            .on_captured(|_| Ok(agent_run(Some(1), "boom\n")))
            .on_captured(move |_| {
                pass_all_tasks(&workspace)?;
                Ok(agent_run(Some(0), "fixed\n"))
            });

        let mut exits = Vec::new();
        let outcome = run_loop(&root, &agent, "p", &LoopSettings::default(), |r| {
            exits.push(r.run.exit_code);
        })
        .expect("loop");

        assert_eq!(outcome.iterations, 2);
        assert_eq!(exits, vec![Some(1), Some(0)]);
    }

    #[test]
    fn iteration_limit_stops_before_exceeding_the_cap() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_tasks(temp.path(), &tasks_with_passes(&[false, false])).expect("write tasks");
        let agent = ScriptedAgent::new();
        let settings = LoopSettings {
            max_iterations: Some(3),
            iteration_timeout: None,
        };

        let outcome = run_loop(temp.path(), &agent, "p", &settings, |_| {}).expect("loop");
        assert_eq!(
            outcome,
            LoopOutcome {
                iterations: 3,
                stop: LoopStop::IterationLimit { max_iterations: 3 }
            }
        );
        assert_eq!(agent.count(CallKind::Captured), 3);
        assert!(read_tasks(temp.path()).expect("read").iter().all(|t| !t.passes));
    }

    #[test]
    fn corrupt_document_stops_the_loop() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_tasks(temp.path(), &tasks_with_passes(&[false])).expect("write tasks");
        let tasks_path = temp.path().join(".chief/tasks.json");
        let agent = ScriptedAgent::new().on_captured(move |_| {
            std::fs::write(&tasks_path, "not json")?;
            Ok(agent_run(Some(0), ""))
        });

        let err = run_loop(temp.path(), &agent, "p", &LoopSettings::default(), |_| {})
            .unwrap_err();
        assert!(format!("{err:#}").contains("parse tasks"));
        assert_eq!(agent.count(CallKind::Captured), 1);
    }

    #[test]
    fn spawn_failure_is_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_tasks(temp.path(), &tasks_with_passes(&[false])).expect("write tasks");
        let agent = ScriptedAgent::new().fail_captured_spawn();

        let err = run_loop(temp.path(), &agent, "p", &LoopSettings::default(), |_| {})
            .unwrap_err();
        assert!(format!("{err:#}").contains("spawn command"));
    }

    #[test]
    fn settings_follow_config() {
        let cfg = RunConfig {
            max_iterations: 5,
            iteration_timeout_secs: 0,
        };
        assert_eq!(
            LoopSettings::from_config(&cfg),
            LoopSettings {
                max_iterations: Some(5),
                iteration_timeout: None
            }
        );
    }
}
