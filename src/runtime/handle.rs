//! The live-machine handle returned by [`MachineBuilder::spawn`].
//!
//! [`MachineBuilder::spawn`]: crate::runtime::MachineBuilder::spawn

use std::fmt;
use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::machine::Machine;
use crate::proxy::{Proxy, ProxyError};
use crate::task::{TaskId, TaskRegistry};

/// Errors from awaiting a machine's end of life.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    /// The reducer loop panicked or its task was aborted.
    #[error("machine loop terminated abnormally: {0}")]
    #[diagnostic(code(spindle::runtime::join))]
    Join(#[from] JoinError),
}

/// Handle to one live machine instance.
///
/// The handle is the construction-side view of a machine: it reads state
/// snapshots, hands out proxies, and ends the machine's life. Dropping the
/// handle tears the machine down (every task cancelled, proxies turned
/// inert), mirroring [`shutdown`](Self::shutdown) minus the await.
pub struct MachineHandle<M: Machine> {
    pub(crate) proxy: Proxy<M>,
    pub(crate) state_rx: watch::Receiver<M::State>,
    pub(crate) registry: Arc<Mutex<TaskRegistry>>,
    pub(crate) shutdown_tx: Option<oneshot::Sender<()>>,
    pub(crate) join_handle: Option<JoinHandle<M::State>>,
    pub(crate) machine_id: String,
}

impl<M: Machine> MachineHandle<M> {
    /// Identity of this machine in tracing output.
    #[must_use]
    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// A fresh feedback handle onto this machine's delivery queue.
    #[must_use]
    pub fn proxy(&self) -> Proxy<M> {
        self.proxy.clone()
    }

    /// Deliver an event. Sugar for `self.proxy().send(event)`.
    pub fn send(&self, event: M::Event) -> Result<(), ProxyError> {
        self.proxy.send(event)
    }

    /// Snapshot of the current state, as of the most recent reduction.
    #[must_use]
    pub fn state(&self) -> M::State {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes. Each reduction publishes the resulting
    /// state; presentation layers can await `changed()` on the receiver.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<M::State> {
        self.state_rx.clone()
    }

    /// Snapshot of the task ids currently registered. At most one task per
    /// id is ever active; the list is empty from the terminal transition
    /// onward.
    #[must_use]
    pub fn active_tasks(&self) -> Vec<TaskId> {
        self.registry.lock().expect("task registry poisoned").ids()
    }

    /// Whether the machine has reached a terminal state or been shut down.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.proxy.is_terminated()
    }

    /// Await the machine's own end of life (a terminal state) and return the
    /// final state. Does not request teardown itself.
    pub async fn join(mut self) -> Result<M::State, RuntimeError> {
        let handle = self
            .join_handle
            .take()
            .expect("join handle taken more than once");
        // `self` stays alive across the await so the shutdown sender is not
        // dropped early, which the loop would read as a teardown request.
        let state = handle.await?;
        self.shutdown_tx.take();
        Ok(state)
    }

    /// Tear the machine down: cancel every task, turn proxies inert, and
    /// return the last state. The transition function is not invoked again,
    /// and events still queued at this point are discarded.
    pub async fn shutdown(mut self) -> Result<M::State, RuntimeError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let handle = self
            .join_handle
            .take()
            .expect("join handle taken more than once");
        Ok(handle.await?)
    }
}

impl<M: Machine> Drop for MachineHandle<M> {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl<M: Machine> fmt::Debug for MachineHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineHandle")
            .field("machine_id", &self.machine_id)
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}
