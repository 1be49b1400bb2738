//! Workspace locator: which worktree a command operates on.
//!
//! Precedence: an explicit name, then auto-detection from the current
//! directory, then an interactive picker over the project's worktrees.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local};
use tracing::{debug, instrument};

use crate::core::detect::parse_workspace_path;
use crate::core::naming::is_valid_worktree_name;
use crate::io::git::Git;
use crate::io::paths::ChiefHome;
use crate::io::terminal::Prompter;

/// One chief worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub project: String,
    pub name: String,
    pub path: PathBuf,
    pub created_at: SystemTime,
}

impl Workspace {
    /// Describe the existing worktree directory at `path`.
    pub fn load(project: &str, name: &str, path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        // Not every filesystem records a birth time.
        let created_at = meta
            .created()
            .or_else(|_| meta.modified())
            .with_context(|| format!("read timestamps of {}", path.display()))?;
        Ok(Self {
            project: project.to_string(),
            name: name.to_string(),
            path: path.to_path_buf(),
            created_at,
        })
    }

    /// Creation date as `YYYY-MM-DD` in local time.
    pub fn created_date(&self) -> String {
        DateTime::<Local>::from(self.created_at)
            .format("%Y-%m-%d")
            .to_string()
    }
}

/// Outcome of [`locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(Workspace),
    /// Nothing to choose from, or the user backed out of the picker.
    Cancelled,
}

/// Worktrees of `project`, newest first. A missing directory yields none.
pub fn list_workspaces(home: &ChiefHome, project: &str) -> Result<Vec<Workspace>> {
    let dir = home.worktrees_dir(project);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut workspaces = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        workspaces.push(Workspace::load(project, name, &path)?);
    }
    workspaces.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
    Ok(workspaces)
}

/// The worktree containing `cwd`, if `cwd` is inside one that exists.
pub fn detect_workspace(home: &ChiefHome, cwd: &Path) -> Result<Option<Workspace>> {
    let detected = parse_workspace_path(home.root(), cwd).or_else(|| {
        // Temp and home directories are often reached through symlinks.
        let home = fs::canonicalize(home.root()).ok()?;
        let cwd = fs::canonicalize(cwd).ok()?;
        parse_workspace_path(&home, &cwd)
    });
    let Some(detected) = detected else {
        return Ok(None);
    };
    if !detected.path.is_dir() {
        debug!(path = %detected.path.display(), "detected worktree no longer exists");
        return Ok(None);
    }
    Workspace::load(&detected.project, &detected.name, &detected.path).map(Some)
}

/// Project name for `cwd`: the detected worktree's project, else the leaf name
/// of the enclosing git repository's main checkout.
pub fn resolve_project(home: &ChiefHome, cwd: &Path, git: &Git) -> Result<String> {
    if let Some(workspace) = detect_workspace(home, cwd)? {
        return Ok(workspace.project);
    }
    require_repository(git)?;
    let root = git.main_repository_root()?;
    root.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot derive a project name from {}", root.display()))
}

pub fn require_repository(git: &Git) -> Result<()> {
    if !git.is_inside_work_tree() {
        bail!("Not in a git repository. Please run from within a git repo.");
    }
    Ok(())
}

/// Resolve the workspace a command should operate on.
#[instrument(skip_all, fields(name = name.unwrap_or("")))]
pub fn locate<P: Prompter>(
    home: &ChiefHome,
    name: Option<&str>,
    cwd: &Path,
    git: &Git,
    prompter: &P,
) -> Result<Selection> {
    let detected = detect_workspace(home, cwd)?;

    let Some(name) = name else {
        if let Some(workspace) = detected {
            debug!(name = %workspace.name, "worktree auto-detected");
            return Ok(Selection::Selected(workspace));
        }
        let project = resolve_project(home, cwd, git)?;
        return pick(home, &project, prompter);
    };

    // Names are joined onto the worktrees directory; `..`, `/` or empty must not escape it.
    if !is_valid_worktree_name(name) {
        bail!("Invalid worktree name: {name:?}\nRun `chief worktrees` to see available worktrees.");
    }
    let project = match detected {
        Some(workspace) => workspace.project,
        None => resolve_project(home, cwd, git)?,
    };
    let path = home.worktree_path(&project, name);
    if !path.is_dir() {
        bail!("Worktree not found: {name}\nRun `chief worktrees` to see available worktrees.");
    }
    Workspace::load(&project, name, &path).map(Selection::Selected)
}

fn pick<P: Prompter>(home: &ChiefHome, project: &str, prompter: &P) -> Result<Selection> {
    let workspaces = list_workspaces(home, project)?;
    if workspaces.is_empty() {
        eprintln!("No worktrees found.");
        eprintln!("Run `chief new` to create one.");
        return Ok(Selection::Cancelled);
    }
    let labels: Vec<String> = workspaces
        .iter()
        .map(|w| format!("{} (created {})", w.name, w.created_date()))
        .collect();
    match prompter.select("Select a worktree:", &labels)? {
        Some(idx) => Ok(workspaces
            .into_iter()
            .nth(idx)
            .map_or(Selection::Cancelled, Selection::Selected)),
        None => Ok(Selection::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedPrompter, TestRepo};

    fn make_worktree_dir(home: &ChiefHome, project: &str, name: &str) -> PathBuf {
        let path = home.worktree_path(project, name);
        fs::create_dir_all(&path).expect("mkdir worktree");
        path
    }

    fn selected_name(selection: Selection) -> String {
        match selection {
            Selection::Selected(workspace) => workspace.name,
            Selection::Cancelled => panic!("expected a selection"),
        }
    }

    #[test]
    fn missing_worktrees_dir_lists_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        assert!(list_workspaces(&home, "shop").expect("list").is_empty());
    }

    #[test]
    fn lists_only_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        make_worktree_dir(&home, "shop", "a");
        make_worktree_dir(&home, "shop", "b");
        fs::write(home.worktrees_dir("shop").join("stray.txt"), "x").expect("write");

        let mut names: Vec<String> = list_workspaces(&home, "shop")
            .expect("list")
            .into_iter()
            .map(|w| w.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn detects_existing_worktree_from_subdirectory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        let root = make_worktree_dir(&home, "shop", "fix-login");
        let nested = root.join("src/app");
        fs::create_dir_all(&nested).expect("mkdir");

        let workspace = detect_workspace(&home, &nested).expect("detect").expect("some");
        assert_eq!(workspace.project, "shop");
        assert_eq!(workspace.name, "fix-login");
    }

    #[test]
    fn detection_requires_existing_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        let cwd = home.worktree_path("shop", "gone");
        assert!(detect_workspace(&home, &cwd).expect("detect").is_none());
    }

    #[test]
    fn auto_detection_beats_the_picker() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        let root = make_worktree_dir(&home, "shop", "fix-login");
        make_worktree_dir(&home, "shop", "other");
        let prompter = ScriptedPrompter::default();

        let selection = locate(&home, None, &root, &Git::new(&root), &prompter).expect("locate");
        assert_eq!(selected_name(selection), "fix-login");
        assert_eq!(prompter.calls(), 0);
    }

    #[test]
    fn explicit_name_overrides_detection() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        let root = make_worktree_dir(&home, "shop", "fix-login");
        make_worktree_dir(&home, "shop", "other");

        let selection = locate(
            &home,
            Some("other"),
            &root,
            &Git::new(&root),
            &ScriptedPrompter::default(),
        )
        .expect("locate");
        assert_eq!(selected_name(selection), "other");
    }

    #[test]
    fn unknown_name_reports_hint() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        let root = make_worktree_dir(&home, "shop", "fix-login");

        let err = locate(
            &home,
            Some("nope"),
            &root,
            &Git::new(&root),
            &ScriptedPrompter::default(),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Worktree not found: nope"));
        assert!(message.contains("chief worktrees"));
    }

    #[test]
    fn names_outside_the_worktrees_directory_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path());
        let root = make_worktree_dir(&home, "shop", "fix-login");
        fs::create_dir_all(home.worktrees_dir("shop").join("a/b")).expect("mkdir nested");

        for name in ["..", "", "a/b", ".", "../shop"] {
            let err = locate(
                &home,
                Some(name),
                &root,
                &Git::new(&root),
                &ScriptedPrompter::default(),
            )
            .unwrap_err();
            assert!(
                err.to_string().starts_with("Invalid worktree name"),
                "{name:?}: {err}"
            );
        }
        assert!(home.project_dir("shop").is_dir());
    }

    #[test]
    fn outside_a_repository_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(temp.path().join("home"));
        let cwd = temp.path().join("plain");
        fs::create_dir_all(&cwd).expect("mkdir");

        let err = locate(&home, None, &cwd, &Git::new(&cwd), &ScriptedPrompter::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not in a git repository. Please run from within a git repo."
        );
    }

    #[test]
    fn picker_uses_repository_project_and_returns_choice() {
        let repo = TestRepo::new().expect("repo");
        let home_dir = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(home_dir.path());
        let project = repo
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .expect("repo dir name")
            .to_string();
        make_worktree_dir(&home, &project, "only-one");
        let prompter = ScriptedPrompter::default().with_select(Some(0));

        let selection =
            locate(&home, None, repo.path(), &Git::new(repo.path()), &prompter).expect("locate");
        assert_eq!(selected_name(selection), "only-one");
        assert_eq!(prompter.calls(), 1);
    }

    #[test]
    fn empty_project_or_cancelled_picker_is_not_an_error() {
        let repo = TestRepo::new().expect("repo");
        let home_dir = tempfile::tempdir().expect("tempdir");
        let home = ChiefHome::new(home_dir.path());
        let git = Git::new(repo.path());

        let selection =
            locate(&home, None, repo.path(), &git, &ScriptedPrompter::default()).expect("locate");
        assert_eq!(selection, Selection::Cancelled);

        let project = resolve_project(&home, repo.path(), &git).expect("project");
        make_worktree_dir(&home, &project, "wt");
        let prompter = ScriptedPrompter::default().with_select(None);
        let selection = locate(&home, None, repo.path(), &git, &prompter).expect("locate");
        assert_eq!(selection, Selection::Cancelled);
    }
}
