//! Reconciling predecessor signals into one decision.
//!
//! The decision depends only on how many times each state was received,
//! never on arrival order, which is what makes run outcomes independent of
//! scheduling.

use crate::core::TaskRunState;

/// What a runner does once every predecessor has signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Invoke the task's capability.
    Execute,
    /// Every predecessor pruned this task.
    Skip,
    /// An upstream dependency was not satisfied.
    Resign,
    /// The run is being force-stopped.
    Stop,
    /// No rule matched. Only reachable with states no runner ever sends.
    Invalid,
}

/// Per-state counts of the received signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalTally {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub resigned: usize,
    pub stopped: usize,
    /// Anything else (`Waiting`, `Running`, `InternalError`).
    pub other: usize,
}

impl SignalTally {
    pub fn from_signals(signals: &[TaskRunState]) -> Self {
        let mut tally = Self::default();
        for signal in signals {
            match signal {
                TaskRunState::Succeeded => tally.succeeded += 1,
                TaskRunState::Failed => tally.failed += 1,
                TaskRunState::Skipped => tally.skipped += 1,
                TaskRunState::Resigned => tally.resigned += 1,
                TaskRunState::Stopped => tally.stopped += 1,
                _ => tally.other += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.resigned + self.stopped + self.other
    }

    /// Outcomes that do not count as a satisfied dependency.
    fn unsatisfied(&self) -> usize {
        self.failed + self.resigned
    }

    /// Apply the vote policy. Rules are checked in order; the first
    /// match wins.
    pub fn decide(&self, best_effort: bool) -> Decision {
        let total = self.total();
        if total == 0 {
            return Decision::Execute;
        }
        if self.stopped > 0 {
            return Decision::Stop;
        }
        if self.skipped == total {
            return Decision::Skip;
        }

        let resign = if best_effort {
            self.unsatisfied() + self.skipped == total
        } else {
            self.unsatisfied() > 0
        };
        if resign {
            return Decision::Resign;
        }

        let execute = self.succeeded > 0
            && if best_effort {
                self.succeeded + self.unsatisfied() + self.skipped == total
            } else {
                self.succeeded + self.skipped == total
            };
        if execute {
            Decision::Execute
        } else {
            Decision::Invalid
        }
    }
}

/// Decide what a task does given its predecessors' signals.
pub fn decide(signals: &[TaskRunState], best_effort: bool) -> Decision {
    SignalTally::from_signals(signals).decide(best_effort)
}
