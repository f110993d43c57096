//! Task data model for the workflow graph.
//!
//! A task is a named unit of work: an execution capability plus the
//! `best_effort` flag that governs how it reconciles predecessor signals.
//! Tasks are stored in a [`Graph`](crate::core::Graph) and addressed by
//! [`TaskRef`] handles.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a graph.
///
/// Every [`TaskRef`] carries the id of the graph that created it, which is
/// how edges across graphs are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Create a new unique graph identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a task inside one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef {
    pub(crate) graph: GraphId,
    pub(crate) index: NodeIndex,
}

impl TaskRef {
    /// The graph this task belongs to.
    pub fn graph_id(&self) -> GraphId {
        self.graph
    }
}

/// What a task's capability reports back to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Single successor to continue to; every other successor is skipped.
    pub branch: Option<String>,
    pub success: bool,
    /// Failure detail collected into the run report. Does not affect signals.
    pub error: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(detail.into()),
            branch: None,
        }
    }

    /// Succeed and continue only to the successor with id `target`.
    pub fn branch_to(target: impl Into<String>) -> Self {
        Self {
            branch: Some(target.into()),
            success: true,
            error: None,
        }
    }

    pub fn with_error(mut self, detail: impl Into<String>) -> Self {
        self.error = Some(detail.into());
        self
    }

    pub fn with_branch(mut self, target: impl Into<String>) -> Self {
        self.branch = Some(target.into());
        self
    }

    /// The branch target, treating an empty id as "no branch".
    pub fn branch_target(&self) -> Option<&str> {
        self.branch.as_deref().filter(|id| !id.is_empty())
    }
}

/// The work a task performs.
///
/// Invoked at most once per run with the context supplied for the task, or
/// `None` when the run has no context for it. Implemented for any matching
/// closure.
pub trait Execute<C>: Send + Sync {
    fn execute(&self, ctx: Option<&C>) -> Outcome;
}

impl<C, F> Execute<C> for F
where
    F: Fn(Option<&C>) -> Outcome + Send + Sync,
{
    fn execute(&self, ctx: Option<&C>) -> Outcome {
        self(ctx)
    }
}

/// Creation-time task attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// One succeeded predecessor is enough to run, whatever its siblings sent.
    pub best_effort: bool,
}

impl TaskOptions {
    pub fn best_effort() -> Self {
        Self { best_effort: true }
    }
}

/// A single task in the workflow graph.
pub struct Task<C> {
    pub(crate) id: String,
    pub(crate) exec: Arc<dyn Execute<C>>,
    pub(crate) best_effort: bool,
}

impl<C> Task<C> {
    pub(crate) fn new(id: &str, exec: Arc<dyn Execute<C>>, options: TaskOptions) -> Self {
        Self {
            id: id.to_string(),
            exec,
            best_effort: options.best_effort,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn best_effort(&self) -> bool {
        self.best_effort
    }

    /// Shared handle to the capability, moved into each run's runner.
    pub(crate) fn capability(&self) -> Arc<dyn Execute<C>> {
        Arc::clone(&self.exec)
    }
}

impl<C> std::fmt::Debug for Task<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("best_effort", &self.best_effort)
            .finish()
    }
}
