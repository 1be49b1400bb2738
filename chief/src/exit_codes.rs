//! Stable exit codes for chief CLI commands.

/// Command succeeded, or the user cancelled a selection.
pub const OK: i32 = 0;
/// Command failed (precondition, parse, git or agent spawn error).
pub const FAILED: i32 = 1;
/// `chief run` stopped at the configured iteration limit with tasks still pending.
pub const INCOMPLETE: i32 = 2;
