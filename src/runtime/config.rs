//! Per-machine runtime configuration.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::effect::ActionError;
use crate::machine::Machine;
use crate::task::TaskId;

/// A failed effect task, as handed to an escalation mapper.
#[derive(Debug)]
pub struct TaskFailure {
    /// Registry id of the failed task; `None` for fire-and-forget actions.
    pub id: Option<TaskId>,
    /// What the action resolved with. Never [`ActionError::Cancelled`];
    /// cancellation unwinds are not failures.
    pub error: ActionError,
}

/// What the runtime does when an effect task fails.
///
/// The registry entry is removed either way; this only decides whether the
/// failure is surfaced to the machine itself.
pub enum TaskErrorPolicy<M: Machine> {
    /// Log the failure at `warn` level and keep going.
    LogAndContinue,
    /// Map the failure to a synthetic event and deliver it through the
    /// normal FIFO queue, so it observes the same ordering guarantees as
    /// every other event.
    Escalate(Arc<dyn Fn(TaskFailure) -> M::Event + Send + Sync>),
}

impl<M: Machine> TaskErrorPolicy<M> {
    /// Build an [`Escalate`](Self::Escalate) policy from a mapping closure.
    pub fn escalate<F>(map: F) -> Self
    where
        F: Fn(TaskFailure) -> M::Event + Send + Sync + 'static,
    {
        Self::Escalate(Arc::new(map))
    }
}

impl<M: Machine> Clone for TaskErrorPolicy<M> {
    fn clone(&self) -> Self {
        match self {
            Self::LogAndContinue => Self::LogAndContinue,
            Self::Escalate(map) => Self::Escalate(Arc::clone(map)),
        }
    }
}

impl<M: Machine> fmt::Debug for TaskErrorPolicy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogAndContinue => write!(f, "TaskErrorPolicy::LogAndContinue"),
            Self::Escalate(_) => write!(f, "TaskErrorPolicy::Escalate(..)"),
        }
    }
}

impl<M: Machine> Default for TaskErrorPolicy<M> {
    fn default() -> Self {
        Self::LogAndContinue
    }
}

/// Runtime options for one machine instance.
pub struct RuntimeConfig<M: Machine> {
    /// Identity used in this machine's tracing span. Defaults to a fresh
    /// UUID so concurrent instances stay distinguishable in logs.
    pub machine_id: String,
    /// Failure handling for effect tasks.
    pub on_task_error: TaskErrorPolicy<M>,
}

impl<M: Machine> RuntimeConfig<M> {
    #[must_use]
    pub fn with_machine_id(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = machine_id.into();
        self
    }

    #[must_use]
    pub fn on_task_error(mut self, policy: TaskErrorPolicy<M>) -> Self {
        self.on_task_error = policy;
        self
    }
}

impl<M: Machine> Default for RuntimeConfig<M> {
    fn default() -> Self {
        Self {
            machine_id: Uuid::new_v4().to_string(),
            on_task_error: TaskErrorPolicy::default(),
        }
    }
}

impl<M: Machine> Clone for RuntimeConfig<M> {
    fn clone(&self) -> Self {
        Self {
            machine_id: self.machine_id.clone(),
            on_task_error: self.on_task_error.clone(),
        }
    }
}

impl<M: Machine> fmt::Debug for RuntimeConfig<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("machine_id", &self.machine_id)
            .field("on_task_error", &self.on_task_error)
            .finish()
    }
}
