//! Run engine for dagflow.
//!
//! There is no central scheduling loop. Each task of a run gets its own
//! tokio task (a runner) and every edge its own single-use channel; a task
//! starts as soon as each of its predecessors has signalled it, and the
//! vote over those signals decides whether it executes, skips, or resigns.

mod channel;
pub mod run;
pub mod runner;
pub mod vote;

pub use run::{run, run_blocking, CompletedRun, RunInstance, StopHandle};
pub use runner::TaskReport;
pub use vote::{decide, Decision, SignalTally};
