//! Pure chief logic (no I/O).
//!
//! Everything here is deterministic and testable with plain values; callers in
//! [`crate::io`] and the orchestration modules supply the data.

pub mod detect;
pub mod naming;
pub mod report;
pub mod stats;
pub mod verification;
