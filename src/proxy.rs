//! The feedback channel running tasks use to deliver events.
//!
//! A [`Proxy`] is a cheap, cloneable, write-only handle onto a machine's
//! mailbox. It carries no reference to machine state, so an effect task may
//! capture it and outlive the transition that spawned it without being able
//! to corrupt runtime internals. Once the machine reaches a terminal state or
//! is torn down the proxy turns inert: every send reports
//! [`ProxyError::MachineTerminated`] rather than silently dropping, so
//! use-after-terminal bugs in calling code stay visible.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use miette::Diagnostic;
use thiserror::Error;

use crate::effect::ActionError;
use crate::machine::Machine;
use crate::task::TaskId;

/// What travels through a machine's mailbox: external/task-fed events, and
/// the runtime's own completion notices, all in one FIFO stream so registry
/// bookkeeping is serialized with reductions.
pub(crate) enum Envelope<M: Machine> {
    /// An event for the transition function.
    Event(M::Event),
    /// A spawned task finished (normally, by error, or by cancellation).
    TaskDone {
        id: Option<TaskId>,
        generation: u64,
        outcome: Result<(), ActionError>,
    },
}

/// Write-only handle for delivering events to a machine.
///
/// Thread-safe: any number of tasks and external callers may hold clones and
/// send concurrently. Deliveries enter a single FIFO queue in arrival order;
/// events produced by tasks get no priority over external ones. A send never
/// blocks beyond the enqueue itself.
pub struct Proxy<M: Machine> {
    pub(crate) tx: flume::Sender<Envelope<M>>,
    pub(crate) terminated: Arc<AtomicBool>,
}

impl<M: Machine> Proxy<M> {
    /// Deliver an event to the owning machine.
    ///
    /// Fails with [`ProxyError::MachineTerminated`] once the machine has
    /// reached a terminal state or been shut down.
    pub fn send(&self, event: M::Event) -> Result<(), ProxyError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(ProxyError::MachineTerminated);
        }
        self.tx
            .send(Envelope::Event(event))
            .map_err(|_| ProxyError::MachineTerminated)
    }

    /// Whether the bound machine has terminated or been torn down.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

// Manual impls: M itself is only a type carrier and need not be Clone/Debug.
impl<M: Machine> Clone for Proxy<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            terminated: Arc::clone(&self.terminated),
        }
    }
}

impl<M: Machine> fmt::Debug for Proxy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}

/// Errors reported to proxy callers.
#[derive(Debug, Error, Diagnostic)]
pub enum ProxyError {
    /// The machine already reached a terminal state or was shut down; the
    /// event was not delivered.
    #[error("machine already terminated; event was not delivered")]
    #[diagnostic(
        code(spindle::proxy::machine_terminated),
        help("Check is_terminated() before sending, or treat this as the machine's end of life.")
    )]
    MachineTerminated,
}
