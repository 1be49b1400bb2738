//! Test-only helpers: task builders, throwaway git repositories, and scripted
//! stand-ins for the agent and the terminal.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::io::agent::{Agent, AgentRequest, AgentRun};
use crate::io::paths::WorkspacePaths;
use crate::io::terminal::Prompter;
use crate::task::Task;

/// Create a deterministic task with explicit `passes`.
pub fn task(category: &str, passes: bool) -> Task {
    let mut task = Task::new(category, format!("{category} task"));
    task.passes = passes;
    task
}

/// One task per entry, in order, named `task-<index>`.
pub fn tasks_with_passes(passes: &[bool]) -> Vec<Task> {
    passes
        .iter()
        .enumerate()
        .map(|(idx, passes)| task(&format!("task-{idx}"), *passes))
        .collect()
}

/// Write `tasks` as the task document of the workspace at `root`.
pub fn write_tasks(root: &Path, tasks: &[Task]) -> Result<()> {
    let paths = WorkspacePaths::new(root);
    fs::create_dir_all(&paths.chief_dir)?;
    let mut buf = serde_json::to_string_pretty(tasks)?;
    buf.push('\n');
    fs::write(&paths.tasks_path, buf)?;
    Ok(())
}

/// Mark every task in the workspace at `root` as passing.
pub fn pass_all_tasks(root: &Path) -> Result<()> {
    let mut tasks = crate::io::task_store::read_tasks(root)?;
    for task in &mut tasks {
        task.passes = true;
    }
    write_tasks(root, &tasks)
}

/// A git repository on branch `main` with one commit and a bare `origin`
/// remote, both inside a temporary directory.
pub struct TestRepo {
    _temp: TempDir,
    path: PathBuf,
    origin: PathBuf,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("repo");
        let origin = temp.path().join("origin.git");
        fs::create_dir_all(&path)?;

        git(temp.path(), &["init", "--bare", "--quiet", "origin.git"])?;
        git(&path, &["init", "--quiet"])?;
        git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
        git(&path, &["config", "user.name", "Chief Test"])?;
        git(&path, &["config", "user.email", "chief@example.com"])?;
        git(&path, &["config", "commit.gpgsign", "false"])?;
        let origin_url = origin.to_string_lossy().into_owned();
        git(&path, &["remote", "add", "origin", &origin_url])?;

        let repo = Self {
            _temp: temp,
            path,
            origin,
        };
        repo.commit_file("README.md", "# test\n")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checkout_new_branch(&self, name: &str) -> Result<()> {
        git(&self.path, &["checkout", "--quiet", "-b", name])?;
        Ok(())
    }

    pub fn commit_file(&self, name: &str, contents: &str) -> Result<()> {
        commit_file_in(&self.path, name, contents)
    }

    /// Branch names present on `origin`.
    pub fn origin_branches(&self) -> Result<Vec<String>> {
        let out = git(&self.origin, &["branch", "--format=%(refname:short)"])?;
        Ok(out.lines().map(str::to_string).collect())
    }
}

/// Write `name` under `dir` and commit it.
pub fn commit_file_in(dir: &Path, name: &str, contents: &str) -> Result<()> {
    fs::write(dir.join(name), contents)?;
    git(dir, &["add", name])?;
    git(dir, &["commit", "--quiet", "-m", &format!("add {name}")])?;
    Ok(())
}

/// Run git in `dir`; a non-zero exit is an error. Returns stdout.
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git").args(args).current_dir(dir).output()?;
    if !out.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// How the agent was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Interactive,
    Captured,
}

/// A recorded agent invocation.
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub kind: CallKind,
    pub request: AgentRequest,
}

type Effect = Box<dyn FnOnce(&AgentRequest) -> Result<AgentRun>>;

/// Agent that records requests and runs queued side effects instead of
/// spawning processes.
///
/// Each invocation pops the next effect for its kind; with an empty queue the
/// call succeeds with no output.
#[derive(Default)]
pub struct ScriptedAgent {
    calls: RefCell<Vec<AgentCall>>,
    interactive: RefCell<VecDeque<Effect>>,
    captured: RefCell<VecDeque<Effect>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_interactive(self, effect: impl FnOnce(&AgentRequest) -> Result<AgentRun> + 'static) -> Self {
        self.interactive.borrow_mut().push_back(Box::new(effect));
        self
    }

    pub fn on_captured(self, effect: impl FnOnce(&AgentRequest) -> Result<AgentRun> + 'static) -> Self {
        self.captured.borrow_mut().push_back(Box::new(effect));
        self
    }

    /// Queue a captured call that fails to spawn.
    pub fn fail_captured_spawn(self) -> Self {
        self.on_captured(|_| Err(anyhow!("spawn command")))
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.calls.borrow().iter().filter(|c| c.kind == kind).count()
    }

    fn invoke(&self, kind: CallKind, request: &AgentRequest) -> Result<AgentRun> {
        self.calls.borrow_mut().push(AgentCall {
            kind,
            request: request.clone(),
        });
        let queue = match kind {
            CallKind::Interactive => &self.interactive,
            CallKind::Captured => &self.captured,
        };
        let effect = queue.borrow_mut().pop_front();
        match effect {
            Some(effect) => effect(request),
            None => Ok(agent_run(Some(0), "")),
        }
    }
}

impl Agent for ScriptedAgent {
    fn interactive(&self, request: &AgentRequest) -> Result<AgentRun> {
        self.invoke(CallKind::Interactive, request)
    }

    fn captured(&self, request: &AgentRequest) -> Result<AgentRun> {
        self.invoke(CallKind::Captured, request)
    }
}

/// A finished agent run with the given exit code and output.
pub fn agent_run(exit_code: Option<i32>, output: &str) -> AgentRun {
    AgentRun {
        exit_code,
        output: output.to_string(),
        output_truncated: 0,
        timed_out: false,
    }
}

/// Prompter answering from queues; an unscripted question is an error.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    multiline: RefCell<VecDeque<String>>,
    select: RefCell<VecDeque<Option<usize>>>,
    multi_select: RefCell<VecDeque<Vec<usize>>>,
    confirm: RefCell<VecDeque<bool>>,
    calls: Cell<usize>,
}

impl ScriptedPrompter {
    pub fn with_multiline(self, answer: &str) -> Self {
        self.multiline.borrow_mut().push_back(answer.to_string());
        self
    }

    pub fn with_select(self, answer: Option<usize>) -> Self {
        self.select.borrow_mut().push_back(answer);
        self
    }

    pub fn with_multi_select(self, answer: Vec<usize>) -> Self {
        self.multi_select.borrow_mut().push_back(answer);
        self
    }

    pub fn with_confirm(self, answer: bool) -> Self {
        self.confirm.borrow_mut().push_back(answer);
        self
    }

    /// Number of questions asked so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn next<T>(&self, queue: &RefCell<VecDeque<T>>, question: &str) -> Result<T> {
        self.calls.set(self.calls.get() + 1);
        queue
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("unscripted prompt: {question}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn multiline(&self, question: &str) -> Result<String> {
        self.next(&self.multiline, question)
    }

    fn select(&self, message: &str, _choices: &[String]) -> Result<Option<usize>> {
        self.next(&self.select, message)
    }

    fn multi_select(&self, message: &str, _choices: &[String]) -> Result<Vec<usize>> {
        self.next(&self.multi_select, message)
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        self.next(&self.confirm, question)
    }
}
