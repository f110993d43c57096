//! Signal channels between task runners.
//!
//! Every edge gets its own single-use channel carrying exactly one
//! [`TaskRunState`] from predecessor to successor. Sink tasks additionally
//! hold an endpoint into the run's shared completion channel. Sending never
//! blocks, so a runner can signal all of its successors and return without
//! waiting for any of them to start listening.

use tokio::sync::{mpsc, oneshot};

use crate::core::TaskRunState;
use crate::dlog_trace;

/// Create the channel for one edge.
pub(crate) fn signal_channel() -> (SignalSender, SignalReceiver) {
    let (tx, rx) = oneshot::channel();
    (SignalSender { tx }, SignalReceiver { rx })
}

/// Producer half of an edge channel. Consumed by the single send.
#[derive(Debug)]
pub(crate) struct SignalSender {
    tx: oneshot::Sender<TaskRunState>,
}

/// Consumer half of an edge channel. Consumed by the single receive.
#[derive(Debug)]
pub(crate) struct SignalReceiver {
    rx: oneshot::Receiver<TaskRunState>,
}

impl SignalReceiver {
    /// Wait for the predecessor's signal.
    ///
    /// A sender dropped without sending means its runner was torn down
    /// mid-run, which is reported as `Stopped`.
    pub(crate) async fn recv(self) -> TaskRunState {
        self.rx.await.unwrap_or(TaskRunState::Stopped)
    }
}

/// Message a sink task posts on the shared completion channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SinkSignal {
    pub task_id: String,
    pub state: TaskRunState,
}

pub(crate) type CompletionSender = mpsc::UnboundedSender<SinkSignal>;
pub(crate) type CompletionReceiver = mpsc::UnboundedReceiver<SinkSignal>;

pub(crate) fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug)]
enum Port {
    Edge(SignalSender),
    Completion(CompletionSender),
}

/// An outbound endpoint of a runner.
#[derive(Debug)]
pub(crate) struct Outbound {
    /// Successor task id; `None` for the completion endpoint of a sink.
    target: Option<String>,
    port: Port,
}

impl Outbound {
    pub(crate) fn edge(target: &str, tx: SignalSender) -> Self {
        Self {
            target: Some(target.to_string()),
            port: Port::Edge(tx),
        }
    }

    pub(crate) fn completion(tx: CompletionSender) -> Self {
        Self {
            target: None,
            port: Port::Completion(tx),
        }
    }

    pub(crate) fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Deliver `state` from task `from`.
    ///
    /// A receiver that has already gone away (a stopped run) is not an error.
    pub(crate) fn send(self, from: &str, state: TaskRunState) {
        match self.port {
            Port::Edge(sender) => {
                dlog_trace!(
                    "signal {} -> {}: {}",
                    from,
                    self.target.as_deref().unwrap_or("?"),
                    state
                );
                let _ = sender.tx.send(state);
            }
            Port::Completion(tx) => {
                dlog_trace!("signal {} -> completion: {}", from, state);
                let _ = tx.send(SinkSignal {
                    task_id: from.to_string(),
                    state,
                });
            }
        }
    }
}
