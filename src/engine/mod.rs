// src/engine/mod.rs

//! Concurrent execution engine.
//!
//! - [`queue`] is the bounded task queue: K lanes pulling jobs from one
//!   shared FIFO backlog, one pending result per submitted item.
//! - [`progress`] decorates operations with timing and "n of m" status lines.
//! - [`batch`] runs one operation over many units, in parallel or strictly
//!   in sequence, and reduces the results to a single verdict.

use std::time::Duration;

pub mod batch;
pub mod progress;
pub mod queue;

pub use batch::{reduce_outcomes, reduce_to_success, BatchRunner, RunMode, ScriptReport};
pub use progress::{LabelFn, MemorySink, ProgressReporter, ProgressSink, TracingSink};
pub use queue::{TaskHandle, TaskQueue};

/// Canonical unit name type used throughout the engine.
pub type UnitName = String;

/// Outcome of an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Non-zero exit code; `-1` when the process could not be spawned or
    /// was killed by a signal.
    Failed(i32),
}

/// Result of running one command for one unit.
///
/// Failures are data: the executor never turns a failing command into a
/// fault that would abort sibling work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub unit: UnitName,
    pub outcome: TaskOutcome,
    /// Spawn error text or the tail of stderr for failed runs.
    pub diagnostic: Option<String>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn success(unit: impl Into<UnitName>, duration: Duration) -> Self {
        Self {
            unit: unit.into(),
            outcome: TaskOutcome::Success,
            diagnostic: None,
            duration,
        }
    }

    pub fn failed(
        unit: impl Into<UnitName>,
        code: i32,
        diagnostic: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            unit: unit.into(),
            outcome: TaskOutcome::Failed(code),
            diagnostic,
            duration,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        !self.is_error()
    }
}
