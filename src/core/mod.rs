//! Graph model for dagflow.
//!
//! Tasks, the edges between them, and the state values a run assigns them.
//! Nothing in here executes anything; see [`crate::engine`] for that.

pub mod graph;
pub mod state;
pub mod task;

pub use graph::Graph;
pub use state::TaskRunState;
pub use task::{Execute, GraphId, Outcome, Task, TaskOptions, TaskRef};
