//! Run-time task states.
//!
//! The same enum doubles as the signal value carried over edge channels:
//! a predecessor tells each successor the state it finished in (or
//! `Skipped` when a branch pruned that successor).

use serde::{Deserialize, Serialize};

/// State of one task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRunState {
    /// Initial state: waiting for predecessor signals.
    Waiting,
    /// The execution capability is being invoked.
    Running,
    /// The capability reported success.
    Succeeded,
    /// The capability reported failure.
    Failed,
    /// Every predecessor pruned this task, or a branch elected another path.
    Skipped,
    /// An upstream dependency was not satisfied.
    Resigned,
    /// The run was force-stopped before this task finished.
    Stopped,
    /// Predecessor signals formed a combination the vote policy does not cover.
    InternalError,
}

impl TaskRunState {
    /// Whether the task can no longer change state in this run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskRunState::Waiting | TaskRunState::Running)
    }

    /// Whether the task's own capability was invoked to reach this state.
    pub fn executed(&self) -> bool {
        matches!(self, TaskRunState::Succeeded | TaskRunState::Failed)
    }
}

impl Default for TaskRunState {
    fn default() -> Self {
        Self::Waiting
    }
}

impl std::fmt::Display for TaskRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskRunState::Waiting => "WAITING",
            TaskRunState::Running => "RUNNING",
            TaskRunState::Succeeded => "SUCCEEDED",
            TaskRunState::Failed => "FAILED",
            TaskRunState::Skipped => "SKIPPED",
            TaskRunState::Resigned => "RESIGNED",
            TaskRunState::Stopped => "STOPPED",
            TaskRunState::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}
