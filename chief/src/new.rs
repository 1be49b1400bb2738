//! `chief new`: create a worktree, plan it with the agent and break the plan
//! into tasks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rand::{Rng, distributions::Alphanumeric};
use tracing::{debug, info, instrument, warn};

use crate::breakdown::{break_down_plan, print_next_steps};
use crate::core::naming::{is_valid_worktree_name, slugify, worktree_name};
use crate::io::agent::{Agent, AgentRequest, PermissionMode};
use crate::io::config::ChiefConfig;
use crate::io::git::Git;
use crate::io::paths::{CHIEF_DIR, ChiefHome, WorkspacePaths};
use crate::io::prompt::{render_name_prompt, render_plan_prompt};
use crate::io::task_store::write_task_schema;
use crate::io::terminal::Prompter;
use crate::io::workspace::{Workspace, require_repository, resolve_project};

const SUFFIX_LEN: usize = 6;
const GITIGNORE_BLOCK: &str = "\n# Chief\n.chief/\n";

/// Create a new worktree for `description` and populate its plan and tasks.
///
/// `description_args` are the words given on the command line; when empty the
/// description is read interactively.
#[instrument(skip_all)]
pub fn create_workspace<A: Agent, P: Prompter>(
    home: &ChiefHome,
    cwd: &Path,
    config: &ChiefConfig,
    description_args: &[String],
    agent: &A,
    prompter: &P,
) -> Result<Workspace> {
    let git = Git::new(cwd);
    require_repository(&git)?;
    let repo_root = git.toplevel()?;
    let project = resolve_project(home, cwd, &git)?;
    ensure_chief_ignored(&repo_root)?;

    let description = read_description(description_args, prompter)?;
    let helper_model = config.agent.helper_model.clone();

    println!("\nNaming worktree...");
    let slug = suggest_slug(agent, &repo_root, &description, helper_model.clone())?;
    let name = worktree_name(&slug, &random_suffix());
    if !is_valid_worktree_name(&name) {
        bail!("Invalid worktree name: {name}");
    }

    let path = home.worktree_path(&project, &name);
    if path.exists() {
        bail!("Worktree already exists: {}", path.display());
    }
    let parent = home.worktrees_dir(&project);
    fs::create_dir_all(&parent).with_context(|| format!("create directory {}", parent.display()))?;
    git.add_worktree(&path, &name)?;
    info!(name = %name, path = %path.display(), "worktree created");
    println!("Created worktree: {}", path.display());

    // The main repository's .gitignore change is not committed yet.
    ensure_chief_ignored(&path)?;
    let copied = copy_env_files(&repo_root, &path)?;
    if copied > 0 {
        println!("Copied {copied} .env file(s) to worktree");
    }

    let paths = WorkspacePaths::new(&path);
    write_task_schema(&paths.chief_dir)?;
    let project_profile = home.project_verification_path(&project);
    if project_profile.is_file() {
        fs::copy(&project_profile, &paths.verification_path).with_context(|| {
            format!(
                "copy {} to {}",
                project_profile.display(),
                paths.verification_path.display()
            )
        })?;
    }

    println!("\nStarting planning session...");
    println!("(Exit the session when you're done planning)\n");
    let plan_request = AgentRequest::new(&path, render_plan_prompt(&description, &paths.plan_path)?)
        .with_permission(PermissionMode::Plan);
    agent
        .interactive(&plan_request)
        .context("run planning session")?;
    if !paths.plan_path.is_file() {
        bail!(
            "No plan was written to {}. Run `chief clean {name}` and start over.",
            paths.plan_path.display()
        );
    }

    let tasks = break_down_plan(agent, &path, &name, helper_model)?;
    let workspace = Workspace::load(&project, &name, &path)?;
    print_next_steps(&workspace, tasks.len());
    Ok(workspace)
}

fn read_description<P: Prompter>(args: &[String], prompter: &P) -> Result<String> {
    let from_args = args.join(" ").trim().to_string();
    let description = if from_args.is_empty() {
        prompter.multiline("Describe what you want to build or accomplish:")?
    } else {
        from_args
    };
    let description = description.trim();
    if description.is_empty() {
        bail!("Project description cannot be empty.");
    }
    Ok(description.to_string())
}

/// Ask the agent for a name; fall back to the description itself.
fn suggest_slug<A: Agent>(
    agent: &A,
    repo_root: &Path,
    description: &str,
    model: Option<String>,
) -> Result<String> {
    let request = AgentRequest::new(repo_root, render_name_prompt(description)?)
        .with_model(model)
        .quiet();
    let run = agent.captured(&request).context("run worktree naming")?;
    let suggested = if run.succeeded() {
        slugify(&run.output)
    } else {
        warn!(exit = %run.describe_exit(), "naming invocation failed");
        None
    };
    if let Some(slug) = suggested {
        debug!(slug = %slug, "agent suggested name");
        return Ok(slug);
    }
    slugify(description).context("Failed to derive a worktree name. Please try again.")
}

/// Lowercase alphanumeric suffix keeping worktree names unique.
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(SUFFIX_LEN)
        .collect::<String>()
        .to_lowercase()
}

/// Make sure `<dir>/.gitignore` ignores `.chief/`. Returns true if it was added.
pub fn ensure_chief_ignored(dir: &Path) -> Result<bool> {
    let path = dir.join(".gitignore");
    let existing = if path.exists() {
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
    } else {
        String::new()
    };
    let already = existing.lines().map(str::trim).any(|line| {
        let line = line.trim_start_matches('/').trim_end_matches('/');
        line == CHIEF_DIR
    });
    if already {
        return Ok(false);
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(if updated.is_empty() {
        GITIGNORE_BLOCK.trim_start()
    } else {
        GITIGNORE_BLOCK
    });
    fs::write(&path, updated).with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "added .chief/ to .gitignore");
    Ok(true)
}

/// Copy top-level `.env*` files from `from` into `to`.
pub fn copy_env_files(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", from.display()))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !name.starts_with(".env") || !entry.path().is_file() {
            continue;
        }
        let dest: PathBuf = to.join(name);
        fs::copy(entry.path(), &dest).with_context(|| format!("copy {name} to {}", dest.display()))?;
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::task_store::read_tasks;
    use crate::io::verification::write_profile;
    use crate::test_support::{
        CallKind, ScriptedAgent, ScriptedPrompter, TestRepo, agent_run, git, tasks_with_passes,
        write_tasks,
    };

    fn project_name(repo: &TestRepo) -> String {
        repo.path()
            .file_name()
            .and_then(|n| n.to_str())
            .expect("repo dir name")
            .to_string()
    }

    #[test]
    fn suffix_is_lowercase_alphanumeric() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn gitignore_entry_is_added_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(".gitignore"), "target").expect("write");

        assert!(ensure_chief_ignored(temp.path()).expect("ensure"));
        assert!(!ensure_chief_ignored(temp.path()).expect("ensure"));
        assert_eq!(
            fs::read_to_string(temp.path().join(".gitignore")).expect("read"),
            "target\n\n# Chief\n.chief/\n"
        );
    }

    #[test]
    fn existing_ignore_variants_are_respected() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(".gitignore"), "/.chief\n").expect("write");
        assert!(!ensure_chief_ignored(temp.path()).expect("ensure"));

        let empty = tempfile::tempdir().expect("tempdir");
        assert!(ensure_chief_ignored(empty.path()).expect("ensure"));
        assert_eq!(
            fs::read_to_string(empty.path().join(".gitignore")).expect("read"),
            "# Chief\n.chief/\n"
        );
    }

    #[test]
    fn copies_only_env_files() {
        let from = tempfile::tempdir().expect("tempdir");
        let to = tempfile::tempdir().expect("tempdir");
        fs::write(from.path().join(".env"), "A=1").expect("write");
        fs::write(from.path().join(".env.local"), "B=2").expect("write");
        fs::write(from.path().join("env.txt"), "no").expect("write");

        assert_eq!(copy_env_files(from.path(), to.path()).expect("copy"), 2);
        assert!(to.path().join(".env.local").is_file());
        assert!(!to.path().join("env.txt").exists());
    }

    #[test]
    fn empty_description_is_rejected_before_any_agent_call() {
        let repo = TestRepo::new().expect("repo");
        let home_dir = tempfile::tempdir().expect("home");
        let home = ChiefHome::new(home_dir.path());
        let agent = ScriptedAgent::new();
        let prompter = ScriptedPrompter::default().with_multiline("  ");

        let err = create_workspace(
            &home,
            repo.path(),
            &ChiefConfig::default(),
            &[],
            &agent,
            &prompter,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Project description cannot be empty.");
        assert!(agent.calls().is_empty());
    }

    #[test]
    fn creates_worktree_plan_and_tasks() {
        let repo = TestRepo::new().expect("repo");
        fs::write(repo.path().join(".env"), "KEY=1").expect("env");
        let home_dir = tempfile::tempdir().expect("home");
        let home = ChiefHome::new(home_dir.path());
        let project = project_name(&repo);
        write_profile(&home.project_verification_path(&project), "- cargo test").expect("profile");

        let agent = ScriptedAgent::new()
            .on_captured(|_| Ok(agent_run(Some(0), "Sure!\nDark-Mode Toggle\n")))
            .on_interactive(|request| {
                fs::write(request.workdir.join(".chief/plan.md"), "# Plan\n")?;
                Ok(agent_run(Some(0), ""))
            })
            .on_captured(|request| {
                write_tasks(&request.workdir, &tasks_with_passes(&[false, false]))?;
                Ok(agent_run(Some(0), ""))
            });

        let workspace = create_workspace(
            &home,
            repo.path(),
            &ChiefConfig::default(),
            &["add".to_string(), "dark mode".to_string()],
            &agent,
            &ScriptedPrompter::default(),
        )
        .expect("create");

        assert_eq!(workspace.project, project);
        assert!(workspace.name.starts_with("dark-mode-toggle-"));
        assert_eq!(workspace.name.len(), "dark-mode-toggle-".len() + SUFFIX_LEN);
        assert_eq!(workspace.path, home.worktree_path(&project, &workspace.name));

        let branch = git(&workspace.path, &["branch", "--show-current"]).expect("branch");
        assert_eq!(branch.trim(), workspace.name);

        let paths = WorkspacePaths::new(&workspace.path);
        assert!(paths.schema_path.is_file());
        assert_eq!(
            fs::read_to_string(&paths.verification_path).expect("profile"),
            "- cargo test\n"
        );
        assert!(workspace.path.join(".env").is_file());
        assert!(
            fs::read_to_string(repo.path().join(".gitignore"))
                .expect("gitignore")
                .contains(".chief/")
        );
        assert_eq!(read_tasks(&workspace.path).expect("tasks").len(), 2);

        let calls = agent.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].kind, CallKind::Interactive);
        assert_eq!(calls[1].request.permission, PermissionMode::Plan);
        assert_eq!(calls[2].request.model.as_deref(), Some("sonnet"));
        assert!(calls[0].request.prompt.contains("add dark mode"));
    }

    #[test]
    fn failed_naming_falls_back_to_description() {
        let repo = TestRepo::new().expect("repo");
        let home_dir = tempfile::tempdir().expect("home");
        let home = ChiefHome::new(home_dir.path());

        let agent = ScriptedAgent::new().on_captured(|_| Ok(agent_run(Some(1), "")));

        // No plan gets written, so the flow stops after creating the worktree.
        let err = create_workspace(
            &home,
            repo.path(),
            &ChiefConfig::default(),
            &["Fix login bug".to_string()],
            &agent,
            &ScriptedPrompter::default(),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("No plan was written"));

        let created: Vec<String> = fs::read_dir(home.worktrees_dir(&project_name(&repo)))
            .expect("worktrees dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("fix-login-bug-"));
    }
}
