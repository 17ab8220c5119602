// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the simulation runtime.

use thiserror::Error;

/// Discriminated status returned by station operations.
///
/// `Teardown` is a clean-exit cue, not a failure: a worker observing it
/// finishes its bookkeeping and returns.
#[derive(Debug, Error)]
pub enum SimError {
    /// The coordination channels have been closed or cancelled.
    #[error("station channels torn down")]
    Teardown,

    /// Configuration rejected before anything was spawned.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A worker task could not be joined at the end of the run.
    #[error("worker lost: {0}")]
    WorkerLost(String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
