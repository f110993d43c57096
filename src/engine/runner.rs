//! Per-task state machine for one run.
//!
//! A runner waits for one signal on each inbound channel, votes on them,
//! optionally invokes its task's capability, and fans the result out over
//! its outbound channels. Runners never look at each other's state; the
//! channels are the only thing they share.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;

use crate::core::{Execute, Outcome, TaskRunState};
use crate::engine::channel::{Outbound, SignalReceiver};
use crate::engine::vote::{Decision, SignalTally};
use crate::{dlog_debug, dlog_error, dlog_warn};

/// Final record of one task in a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub id: String,
    pub state: TaskRunState,
    /// Failure detail reported by the capability, or by the engine for
    /// panics and invalid signal combinations.
    pub error: Option<String>,
    /// When the capability was invoked, if it was.
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Run-scoped twin of a task.
pub(crate) struct TaskRunner<C> {
    id: String,
    best_effort: bool,
    exec: Arc<dyn Execute<C>>,
    /// Written only by this runner.
    state: TaskRunState,
    ins: Vec<SignalReceiver>,
    outs: Vec<Outbound>,
    cancel: CancellationToken,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

impl<C> TaskRunner<C>
where
    C: Send + Sync + 'static,
{
    pub(crate) fn new(
        id: &str,
        best_effort: bool,
        exec: Arc<dyn Execute<C>>,
        ins: Vec<SignalReceiver>,
        outs: Vec<Outbound>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: id.to_string(),
            best_effort,
            exec,
            state: TaskRunState::Waiting,
            ins,
            outs,
            cancel,
            error: None,
            started_at: None,
        }
    }

    /// Drive the task to a terminal state and report it.
    pub(crate) async fn run(mut self, ctx: Option<C>) -> TaskReport {
        if self.ins.is_empty() {
            return self.execute_and_signal(ctx).await;
        }

        let ins = std::mem::take(&mut self.ins);
        let cancel = self.cancel.clone();
        let signals = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            signals = join_all(ins.into_iter().map(SignalReceiver::recv)) => Some(signals),
        };
        let Some(signals) = signals else {
            dlog_debug!("task {}: stopped while waiting", self.id);
            return self.finish(TaskRunState::Stopped, TaskRunState::Stopped);
        };

        let tally = SignalTally::from_signals(&signals);
        let decision = tally.decide(self.best_effort);
        dlog_debug!(
            "task {}: signals {:?} best_effort={} -> {:?}",
            self.id,
            tally,
            self.best_effort,
            decision
        );

        match decision {
            Decision::Execute => self.execute_and_signal(ctx).await,
            Decision::Skip => self.finish(TaskRunState::Skipped, TaskRunState::Skipped),
            Decision::Resign => self.finish(TaskRunState::Resigned, TaskRunState::Resigned),
            Decision::Stop => self.finish(TaskRunState::Stopped, TaskRunState::Stopped),
            Decision::Invalid => {
                dlog_error!(
                    "task {}: undefined state transition from signals {:?}",
                    self.id,
                    signals
                );
                self.error = Some(format!("undefined state transition from signals {:?}", signals));
                self.finish(TaskRunState::InternalError, TaskRunState::Resigned)
            }
        }
    }

    async fn execute_and_signal(mut self, ctx: Option<C>) -> TaskReport {
        if self.cancel.is_cancelled() {
            dlog_debug!("task {}: stopped before running", self.id);
            return self.finish(TaskRunState::Stopped, TaskRunState::Stopped);
        }
        self.state = TaskRunState::Running;
        self.started_at = Some(Utc::now());
        dlog_debug!("task {}: running", self.id);

        let exec = Arc::clone(&self.exec);
        let handle = spawn_blocking(move || exec.execute(ctx.as_ref()));
        let cancel = self.cancel.clone();
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            joined = handle => Some(joined),
        };

        let outcome = match joined {
            // The capability keeps running on the blocking pool; its result is dropped.
            None => {
                dlog_debug!("task {}: stopped while running", self.id);
                return self.finish(TaskRunState::Stopped, TaskRunState::Stopped);
            }
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => {
                dlog_warn!("task {}: capability panicked: {}", self.id, e);
                Outcome::failure(format!("task {} panicked: {}", self.id, e))
            }
        };

        self.state = if outcome.success {
            TaskRunState::Succeeded
        } else {
            TaskRunState::Failed
        };
        self.error = outcome.error.clone();

        match outcome.branch_target() {
            None => {
                let state = self.state;
                self.finish(state, state)
            }
            Some(target) => {
                if !self.outs.iter().any(|out| out.target() == Some(target)) {
                    dlog_warn!(
                        "task {}: branch target {} is not a successor, skipping all",
                        self.id,
                        target
                    );
                }
                self.branch(target.to_string())
            }
        }
    }

    /// Send the true state to `target` and `Skipped` to every other successor.
    ///
    /// The completion endpoint of a sink always gets the true state.
    fn branch(mut self, target: String) -> TaskReport {
        dlog_debug!("task {}: {} branching to {}", self.id, self.state, target);
        let state = self.state;
        for out in std::mem::take(&mut self.outs) {
            let signal = match out.target() {
                Some(t) if t != target => TaskRunState::Skipped,
                _ => state,
            };
            out.send(&self.id, signal);
        }
        self.report()
    }

    /// Enter `state` and broadcast `signal` on every outbound endpoint.
    fn finish(mut self, state: TaskRunState, signal: TaskRunState) -> TaskReport {
        self.state = state;
        dlog_debug!("task {}: {}", self.id, state);
        for out in std::mem::take(&mut self.outs) {
            out.send(&self.id, signal);
        }
        self.report()
    }

    fn report(self) -> TaskReport {
        TaskReport {
            id: self.id,
            state: self.state,
            error: self.error,
            started_at: self.started_at,
            finished_at: Some(Utc::now()),
        }
    }
}
