//! Run instances: one concurrent execution of a graph.
//!
//! A run is built in two passes. The first creates one runner slot per
//! task with fixed-size inbound and outbound endpoint lists; the second
//! allocates one channel per edge and installs its halves on both ends.
//! Each sink additionally gets an endpoint on the shared completion
//! channel. Every runner is then spawned, and [`RunInstance::wait`]
//! returns once every sink has reported and every runner has been joined.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{Graph, TaskRunState};
use crate::engine::channel::{
    completion_channel, signal_channel, CompletionReceiver, Outbound, SignalReceiver,
};
use crate::engine::runner::{TaskReport, TaskRunner};
use crate::error::{Error, Result};
use crate::{dlog, dlog_debug, dlog_error, dlog_warn};

/// Endpoint lists of one runner while a run is being wired.
struct Slot {
    ins: Vec<Option<SignalReceiver>>,
    outs: Vec<Option<Outbound>>,
}

/// Cloneable handle that force-stops a run from anywhere.
#[derive(Debug, Clone)]
pub struct StopHandle {
    cancel: CancellationToken,
}

impl StopHandle {
    /// Stop the run: waiting and executing tasks become `Stopped`.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A run in progress.
pub struct RunInstance {
    run_id: Uuid,
    graph_name: String,
    started_at: DateTime<Utc>,
    /// Runner handles in graph insertion order.
    handles: Vec<JoinHandle<TaskReport>>,
    completion_rx: CompletionReceiver,
    sink_count: usize,
    cancel: CancellationToken,
}

impl RunInstance {
    /// Build every runner and channel for `graph` and start all runners.
    ///
    /// Each task gets the entry of `contexts` under its id, or `None`.
    ///
    /// # Errors
    /// Returns `Error::Runtime` when called outside a tokio runtime.
    pub fn start<C>(graph: &Graph<C>, mut contexts: HashMap<String, C>) -> Result<Self>
    where
        C: Send + Sync + 'static,
    {
        let handle = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let nodes: Vec<NodeIndex> = graph.node_indices().collect();

        // First pass: one slot per task, sized but unwired.
        let mut slots: Vec<Slot> = nodes
            .iter()
            .map(|&index| Slot {
                ins: empty_endpoints(graph.neighbor_indices(index, Direction::Incoming).len()),
                outs: empty_endpoints(graph.neighbor_indices(index, Direction::Outgoing).len()),
            })
            .collect();

        // Second pass: one channel per edge, plus completion endpoints on sinks.
        let (completion_tx, completion_rx) = completion_channel();
        let mut sink_count = 0;
        for &index in &nodes {
            let Some(task) = graph.node(index) else {
                continue;
            };
            let next = graph.neighbor_indices(index, Direction::Outgoing);
            if next.is_empty() {
                slots[index.index()]
                    .outs
                    .push(Some(Outbound::completion(completion_tx.clone())));
                sink_count += 1;
            }

            for (j, pred) in graph
                .neighbor_indices(index, Direction::Incoming)
                .into_iter()
                .enumerate()
            {
                let (tx, rx) = signal_channel();
                slots[index.index()].ins[j] = Some(rx);
                let position = graph
                    .neighbor_indices(pred, Direction::Outgoing)
                    .iter()
                    .position(|&succ| succ == index)
                    .ok_or_else(|| {
                        Error::Validation(format!("edge into {} missing from its predecessor", task.id()))
                    })?;
                slots[pred.index()].outs[position] = Some(Outbound::edge(task.id(), tx));
            }
        }
        drop(completion_tx);

        let mut runners = Vec::with_capacity(nodes.len());
        for (&index, slot) in nodes.iter().zip(slots) {
            let Some(task) = graph.node(index) else {
                continue;
            };
            let ins = wired(slot.ins, task.id())?;
            let outs = wired(slot.outs, task.id())?;
            let runner = TaskRunner::new(
                task.id(),
                task.best_effort(),
                task.capability(),
                ins,
                outs,
                cancel.clone(),
            );
            runners.push((runner, contexts.remove(task.id())));
        }

        dlog!(
            "run {}: graph {} with {} tasks, {} sinks",
            &run_id.to_string()[..8],
            graph.name(),
            nodes.len(),
            sink_count
        );

        let handles = runners
            .into_iter()
            .map(|(runner, ctx)| handle.spawn(runner.run(ctx)))
            .collect();

        Ok(Self {
            run_id,
            graph_name: graph.name().to_string(),
            started_at: Utc::now(),
            handles,
            completion_rx,
            sink_count,
            cancel,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Abort the run in progress.
    ///
    /// Tasks still waiting or executing finish as `Stopped`; tasks that
    /// already finished keep their state.
    pub fn force_stop(&self) {
        dlog_warn!("run {}: force stop requested", self.run_id);
        self.cancel.cancel();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Wait for every sink to report, then join every runner.
    ///
    /// # Errors
    /// Returns `Error::TaskJoin` if a runner could not be joined.
    pub async fn wait(self) -> Result<CompletedRun> {
        let RunInstance {
            run_id,
            graph_name,
            started_at,
            handles,
            mut completion_rx,
            sink_count,
            cancel,
        } = self;

        let mut remaining = sink_count;
        while remaining > 0 {
            tokio::select! {
                _ = cancel.cancelled() => break,
                signal = completion_rx.recv() => match signal {
                    Some(signal) => {
                        dlog_debug!("run {}: sink {} finished {}", run_id, signal.task_id, signal.state);
                        remaining -= 1;
                    }
                    None => break,
                },
            }
        }

        let mut tasks = Vec::with_capacity(handles.len());
        for handle in handles {
            let report = handle.await.map_err(|e| Error::TaskJoin(e.to_string()))?;
            if !report.state.is_terminal() {
                dlog_error!("run {}: task {} ended in {}", run_id, report.id, report.state);
            }
            tasks.push(report);
        }

        let run = CompletedRun {
            run_id,
            graph: graph_name,
            started_at,
            finished_at: Utc::now(),
            tasks,
        };
        dlog!(
            "run {}: finished{}, {} failures",
            &run_id.to_string()[..8],
            if run.stopped() { " (stopped)" } else { "" },
            run.failures().len()
        );
        Ok(run)
    }
}

fn empty_endpoints<T>(len: usize) -> Vec<Option<T>> {
    std::iter::repeat_with(|| None).take(len).collect()
}

fn wired<T>(endpoints: Vec<Option<T>>, task_id: &str) -> Result<Vec<T>> {
    endpoints
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| Error::Validation(format!("task {} has an unwired endpoint", task_id)))
}

/// Final state of every task after a run.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub graph: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One report per task, in graph insertion order.
    pub tasks: Vec<TaskReport>,
}

impl CompletedRun {
    pub fn report(&self, id: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn state(&self, id: &str) -> Option<TaskRunState> {
        self.report(id).map(|t| t.state)
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.report(id).and_then(|t| t.error.as_deref())
    }

    /// Task id to final state.
    pub fn states(&self) -> HashMap<&str, TaskRunState> {
        self.tasks.iter().map(|t| (t.id.as_str(), t.state)).collect()
    }

    /// Task id to failure detail, for every task that reported one.
    pub fn failures(&self) -> HashMap<&str, &str> {
        self.tasks
            .iter()
            .filter_map(|t| t.error.as_deref().map(|e| (t.id.as_str(), e)))
            .collect()
    }

    /// Whether the run was force-stopped before every task finished.
    pub fn stopped(&self) -> bool {
        self.tasks.iter().any(|t| t.state == TaskRunState::Stopped)
    }

    /// Ids of tasks whose capability actually ran.
    pub fn executed(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.state.executed())
            .map(|t| t.id.as_str())
            .collect()
    }

    /// One line per task: `task <id> : state <STATE>`.
    pub fn status_report(&self) -> String {
        let mut out = String::new();
        for task in &self.tasks {
            out.push_str(&format!("task {} : state {}", task.id, task.state));
            if let Some(error) = &task.error {
                out.push_str(&format!(" ({})", error));
            }
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Display for CompletedRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status_report())
    }
}

/// Start a run of `graph` and wait for it to complete.
pub async fn run<C>(graph: &Graph<C>, contexts: HashMap<String, C>) -> Result<CompletedRun>
where
    C: Send + Sync + 'static,
{
    RunInstance::start(graph, contexts)?.wait().await
}

/// Run `graph` to completion on a dedicated multi-thread runtime.
///
/// For callers that are not async themselves.
pub fn run_blocking<C>(graph: &Graph<C>, contexts: HashMap<String, C>) -> Result<CompletedRun>
where
    C: Send + Sync + 'static,
{
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(run(graph, contexts));
    // Capabilities abandoned by a force stop may still be on the blocking pool.
    rt.shutdown_background();
    result
}
