//! I/O helpers for chief commands.

pub mod agent;
pub mod config;
pub mod git;
pub mod iteration_log;
pub mod paths;
pub mod process;
pub mod prompt;
pub mod task_store;
pub mod terminal;
pub mod verification;
pub mod workspace;
