//! dagflow: a minimal workflow orchestrator.
//!
//! Declare tasks and the dependency edges between them in a [`Graph`],
//! then execute one run of it with [`run`]. Each task starts once its
//! predecessors have all finished, and their outcomes decide whether it
//! executes, is skipped, or resigns.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use dagflow::{Graph, Outcome, TaskRunState};
//!
//! # async fn example() -> dagflow::Result<()> {
//! let mut graph: Graph<String> = Graph::new("linear");
//! let source = graph.add_task("source", |_: Option<&String>| Outcome::success())?;
//! let job = graph.add_task("job_1", |_: Option<&String>| Outcome::success())?;
//! graph.add_edge(source, job)?;
//!
//! let run = dagflow::run(&graph, HashMap::new()).await?;
//! assert_eq!(run.state("job_1"), Some(TaskRunState::Succeeded));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod demo;
pub mod engine;
pub mod error;
pub mod log;

pub use crate::core::{Execute, Graph, GraphId, Outcome, Task, TaskOptions, TaskRef, TaskRunState};
pub use engine::{run, run_blocking, CompletedRun, RunInstance, StopHandle, TaskReport};
pub use error::{Error, Result};
