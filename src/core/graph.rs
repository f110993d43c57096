//! Workflow graph of tasks and dependency edges.
//!
//! The graph is immutable once a run starts: runs borrow it to build their
//! own runners and channels and never write back. Edges are validated as
//! they are added, so every graph is acyclic and free of duplicate edges.

use crate::core::task::{Execute, GraphId, Task, TaskOptions, TaskRef};
use crate::core::Outcome;
use crate::error::{Error, Result};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use std::sync::Arc;

/// A named collection of tasks and the directed edges between them.
///
/// Generic over the per-task context type `C` handed to capabilities at
/// run time.
pub struct Graph<C> {
    id: GraphId,
    name: String,
    /// Nodes are tasks in insertion order; edges carry no weight.
    graph: DiGraph<Task<C>, ()>,
    /// Index mapping from task id to node for fast lookups.
    task_index: HashMap<String, NodeIndex>,
}

impl<C> Graph<C> {
    /// Create a new empty graph.
    pub fn new(name: &str) -> Self {
        Self {
            id: GraphId::new(),
            name: name.to_string(),
            graph: DiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a task whose capability is a closure.
    ///
    /// # Errors
    /// - `InvalidId` if `id` is empty
    /// - `DuplicateId` if a task with `id` already exists
    pub fn add_task<F>(&mut self, id: &str, exec: F) -> Result<TaskRef>
    where
        F: Fn(Option<&C>) -> Outcome + Send + Sync + 'static,
    {
        self.add_task_with(id, exec, TaskOptions::default())
    }

    /// Add a task with explicit creation-time options.
    pub fn add_task_with<E>(&mut self, id: &str, exec: E, options: TaskOptions) -> Result<TaskRef>
    where
        E: Execute<C> + 'static,
    {
        if id.is_empty() {
            return Err(Error::InvalidId);
        }
        if self.task_index.contains_key(id) {
            return Err(Error::DuplicateId(id.to_string()));
        }

        let index = self.graph.add_node(Task::new(id, Arc::new(exec), options));
        self.task_index.insert(id.to_string(), index);
        Ok(TaskRef {
            graph: self.id,
            index,
        })
    }

    /// Change a task's best-effort policy.
    pub fn set_best_effort(&mut self, task: TaskRef, best_effort: bool) -> Result<()> {
        let index = self.local(task)?;
        if let Some(task) = self.graph.node_weight_mut(index) {
            task.best_effort = best_effort;
        }
        Ok(())
    }

    /// Add the edge `from -> to`: `to` starts only after `from` signals it.
    ///
    /// # Errors
    /// - `CrossGraph` if either task belongs to another graph
    /// - `DuplicateEdge` if the edge already exists
    /// - `Cycle` if `to` already reaches `from` (self-loops included)
    pub fn add_edge(&mut self, from: TaskRef, to: TaskRef) -> Result<()> {
        if from.graph != self.id || to.graph != self.id {
            return Err(Error::CrossGraph {
                from: self.label(from),
                to: self.label(to),
            });
        }
        let (from_index, to_index) = (self.local(from)?, self.local(to)?);

        if self.graph.find_edge(from_index, to_index).is_some() {
            return Err(Error::DuplicateEdge {
                from: self.label(from),
                to: self.label(to),
            });
        }
        if has_path_connecting(&self.graph, to_index, from_index, None) {
            return Err(Error::Cycle {
                from: self.label(from),
                to: self.label(to),
            });
        }

        self.graph.add_edge(from_index, to_index, ());
        Ok(())
    }

    /// Set `up` as a predecessor of `task`.
    pub fn set_upstream(&mut self, task: TaskRef, up: TaskRef) -> Result<()> {
        self.add_edge(up, task)
    }

    /// Set `down` as a successor of `task`.
    pub fn set_downstream(&mut self, task: TaskRef, down: TaskRef) -> Result<()> {
        self.add_edge(task, down)
    }

    /// Add an edge between two tasks named by id.
    pub fn add_edge_by_id(&mut self, from: &str, to: &str) -> Result<()> {
        let from = self
            .lookup(from)
            .ok_or_else(|| Error::TaskNotFound(from.to_string()))?;
        let to = self
            .lookup(to)
            .ok_or_else(|| Error::TaskNotFound(to.to_string()))?;
        self.add_edge(from, to)
    }

    /// Find the handle of the task with `id`.
    pub fn lookup(&self, id: &str) -> Option<TaskRef> {
        self.task_index.get(id).map(|&index| TaskRef {
            graph: self.id,
            index,
        })
    }

    pub fn task(&self, task: TaskRef) -> Option<&Task<C>> {
        if task.graph != self.id {
            return None;
        }
        self.graph.node_weight(task.index)
    }

    pub fn get(&self, id: &str) -> Option<&Task<C>> {
        self.task_index
            .get(id)
            .and_then(|&index| self.graph.node_weight(index))
    }

    /// All tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task<C>> {
        self.graph.node_weights()
    }

    /// Handles of all tasks in insertion order.
    pub fn task_refs(&self) -> Vec<TaskRef> {
        self.graph
            .node_indices()
            .map(|index| TaskRef {
                graph: self.id,
                index,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Successors of `task` in the order their edges were added.
    pub fn next(&self, task: TaskRef) -> Vec<TaskRef> {
        self.neighbors(task, Direction::Outgoing)
    }

    /// Predecessors of `task` in the order their edges were added.
    pub fn prior(&self, task: TaskRef) -> Vec<TaskRef> {
        self.neighbors(task, Direction::Incoming)
    }

    /// Tasks with no predecessors.
    pub fn roots(&self) -> Vec<TaskRef> {
        self.task_refs()
            .into_iter()
            .filter(|&t| self.prior(t).is_empty())
            .collect()
    }

    /// Tasks with no successors; a run completes when all of them report.
    pub fn sinks(&self) -> Vec<TaskRef> {
        self.task_refs()
            .into_iter()
            .filter(|&t| self.next(t).is_empty())
            .collect()
    }

    /// Tasks ordered so that each comes after all of its predecessors.
    pub fn topological_order(&self) -> Result<Vec<&Task<C>>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let id = self
                .graph
                .node_weight(cycle.node_id())
                .map(|t| t.id.as_str())
                .unwrap_or("unknown");
            Error::Validation(format!("Cycle detected at task: {}", id))
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index))
            .collect())
    }

    /// One line per task: `id -> successor, successor`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for task in self.task_refs() {
            let next: Vec<&str> = self
                .next(task)
                .into_iter()
                .filter_map(|t| self.task(t).map(|t| t.id()))
                .collect();
            let id = self.task(task).map(|t| t.id()).unwrap_or("?");
            out.push_str(&format!("{} -> {}\n", id, next.join(", ")));
        }
        out
    }

    fn neighbors(&self, task: TaskRef, direction: Direction) -> Vec<TaskRef> {
        if task.graph != self.id {
            return Vec::new();
        }
        self.neighbor_indices(task.index, direction)
            .into_iter()
            .map(|index| TaskRef {
                graph: self.id,
                index,
            })
            .collect()
    }

    /// Neighbors by node index, oldest edge first.
    ///
    /// Edges are never removed, so edge indices follow insertion order.
    pub(crate) fn neighbor_indices(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        self.graph
            .edge_references()
            .filter_map(|e| match direction {
                Direction::Outgoing if e.source() == index => Some(e.target()),
                Direction::Incoming if e.target() == index => Some(e.source()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn node(&self, index: NodeIndex) -> Option<&Task<C>> {
        self.graph.node_weight(index)
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    fn local(&self, task: TaskRef) -> Result<NodeIndex> {
        if task.graph == self.id && self.graph.node_weight(task.index).is_some() {
            Ok(task.index)
        } else {
            Err(Error::TaskNotFound(self.label(task)))
        }
    }

    /// Human-readable name for a handle, including foreign ones.
    fn label(&self, task: TaskRef) -> String {
        match self.task(task) {
            Some(t) => t.id.clone(),
            None => format!("#{} of graph {}", task.index.index(), task.graph.short()),
        }
    }
}

impl<C> std::fmt::Display for Graph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl<C> std::fmt::Debug for Graph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("tasks", &self.len())
            .field("edges", &self.edge_count())
            .finish()
    }
}
