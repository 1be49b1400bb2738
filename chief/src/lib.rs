//! Worktree-scoped task runner for an external coding agent.
//!
//! `chief` keeps one git worktree per feature, a plan and a task list inside it,
//! and drives the agent one task at a time until every task passes. The crate is
//! split the same way throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (task statistics, path detection,
//!   verification normalization). No I/O.
//! - **[`io`]**: Side-effecting operations (filesystem, git, agent processes,
//!   terminal prompts). Isolated behind traits where tests need to script them.
//!
//! Orchestration modules ([`run`], [`looping`], [`publish`], [`new`],
//! [`breakdown`], [`clean`]) coordinate core logic with I/O to implement CLI
//! commands.

pub mod breakdown;
pub mod clean;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod new;
pub mod publish;
pub mod run;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
