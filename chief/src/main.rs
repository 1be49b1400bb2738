use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use chief::breakdown::create_tasks;
use chief::clean::{CleanOutcome, clean_workspace};
use chief::core::report::{Progress, WorktreeSummary, render_task_list, render_worktree_list};
use chief::core::stats::task_stats;
use chief::exit_codes;
use chief::io::agent::ClaudeAgent;
use chief::io::config::{ChiefConfig, load_config};
use chief::io::git::Git;
use chief::io::paths::ChiefHome;
use chief::io::task_store::read_tasks;
use chief::io::terminal::TerminalPrompter;
use chief::io::workspace::{Selection, Workspace, list_workspaces, locate, resolve_project};
use chief::logging;
use chief::new::create_workspace;
use chief::run::{RunMode, RunOutcome, run_workspace};

#[derive(Parser, Debug)]
#[command(
    name = "chief",
    version,
    about = "Run a coding agent over a worktree's task list until every task passes"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work through the tasks of a worktree, then push and open a pull request.
    Run {
        /// Worktree name (defaults to the worktree containing the current directory).
        name: Option<String>,
        /// Run a single interactive session instead of looping.
        #[arg(short, long)]
        single: bool,
    },
    /// Create a worktree, plan it with the agent and break the plan into tasks.
    New {
        /// What to build; asked for interactively when omitted.
        description: Vec<String>,
    },
    /// List the tasks of a worktree, or recreate them from its plan.
    #[command(args_conflicts_with_subcommands = true)]
    Tasks {
        #[command(subcommand)]
        action: Option<TasksAction>,
        name: Option<String>,
    },
    /// List the worktrees of the current project.
    Worktrees,
    /// Print the path of a worktree (`cd $(chief cd)`).
    Cd { name: Option<String> },
    /// Remove a worktree.
    Clean {
        name: Option<String>,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TasksAction {
    /// List the tasks of a worktree.
    List { name: Option<String> },
    /// Convert the worktree's plan into tasks again.
    Create { name: Option<String> },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(exit_codes::FAILED);
        }
    }
}

/// Paths and settings shared by every command.
struct Env {
    home: ChiefHome,
    cwd: PathBuf,
}

impl Env {
    fn load() -> Result<Self> {
        Ok(Self {
            home: ChiefHome::from_env()?,
            cwd: std::env::current_dir().context("read current directory")?,
        })
    }

    fn config(&self) -> Result<ChiefConfig> {
        load_config(&self.home.config_path())
    }

    fn git(&self) -> Git {
        Git::new(&self.cwd)
    }

    fn locate(&self, name: Option<&str>) -> Result<Option<Workspace>> {
        match locate(&self.home, name, &self.cwd, &self.git(), &TerminalPrompter)? {
            Selection::Selected(workspace) => Ok(Some(workspace)),
            Selection::Cancelled => Ok(None),
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let env = Env::load()?;
    match cli.command {
        Command::Run { name, single } => cmd_run(&env, name.as_deref(), single),
        Command::New { description } => cmd_new(&env, &description),
        Command::Tasks { action, name } => match action {
            None => cmd_tasks(&env, name.as_deref()),
            Some(TasksAction::List { name }) => cmd_tasks(&env, name.as_deref()),
            Some(TasksAction::Create { name }) => cmd_tasks_create(&env, name.as_deref()),
        },
        Command::Worktrees => cmd_worktrees(&env),
        Command::Cd { name } => cmd_cd(&env, name.as_deref()),
        Command::Clean { name, yes } => cmd_clean(&env, name.as_deref(), yes),
    }
}

fn cmd_run(env: &Env, name: Option<&str>, single: bool) -> Result<i32> {
    let Some(workspace) = env.locate(name)? else {
        return Ok(exit_codes::OK);
    };
    let config = env.config()?;
    let agent = ClaudeAgent::new(config.agent.clone());
    let mode = if single { RunMode::Single } else { RunMode::Loop };
    let outcome = run_workspace(&env.home, &workspace, &config, mode, &agent, &TerminalPrompter)?;
    Ok(match outcome {
        RunOutcome::Incomplete(_) => exit_codes::INCOMPLETE,
        RunOutcome::Single { .. } | RunOutcome::Completed { .. } => exit_codes::OK,
    })
}

fn cmd_new(env: &Env, description: &[String]) -> Result<i32> {
    let config = env.config()?;
    let agent = ClaudeAgent::new(config.agent.clone());
    create_workspace(&env.home, &env.cwd, &config, description, &agent, &TerminalPrompter)?;
    Ok(exit_codes::OK)
}

fn cmd_tasks(env: &Env, name: Option<&str>) -> Result<i32> {
    let Some(workspace) = env.locate(name)? else {
        return Ok(exit_codes::OK);
    };
    let tasks = read_tasks(&workspace.path)?;
    print!("{}", render_task_list(&workspace.name, &tasks));
    Ok(exit_codes::OK)
}

fn cmd_tasks_create(env: &Env, name: Option<&str>) -> Result<i32> {
    let Some(workspace) = env.locate(name)? else {
        return Ok(exit_codes::OK);
    };
    let config = env.config()?;
    let agent = ClaudeAgent::new(config.agent.clone());
    create_tasks(&workspace, &config, &agent)?;
    Ok(exit_codes::OK)
}

fn cmd_worktrees(env: &Env) -> Result<i32> {
    let project = resolve_project(&env.home, &env.cwd, &env.git())?;
    let summaries: Vec<WorktreeSummary> = list_workspaces(&env.home, &project)?
        .into_iter()
        .map(|workspace| WorktreeSummary {
            created: workspace.created_date(),
            progress: progress_of(&workspace.path),
            name: workspace.name,
            path: workspace.path,
        })
        .collect();
    print!("{}", render_worktree_list(&summaries));
    Ok(exit_codes::OK)
}

fn progress_of(path: &Path) -> Progress {
    match read_tasks(path) {
        Ok(tasks) if tasks.is_empty() => Progress::NoTasks,
        Ok(tasks) => Progress::Tasks(task_stats(&tasks)),
        Err(err) => {
            warn!(path = %path.display(), err = %format!("{err:#}"), "unreadable task document");
            Progress::Unreadable
        }
    }
}

fn cmd_cd(env: &Env, name: Option<&str>) -> Result<i32> {
    if let Some(workspace) = env.locate(name)? {
        println!("{}", workspace.path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_clean(env: &Env, name: Option<&str>, yes: bool) -> Result<i32> {
    let Some(workspace) = env.locate(name)? else {
        return Ok(exit_codes::OK);
    };
    if clean_workspace(&workspace, yes, &TerminalPrompter)? == CleanOutcome::Cancelled {
        tracing::debug!(name = %workspace.name, "clean cancelled");
    }
    Ok(exit_codes::OK)
}
