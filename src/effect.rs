//! Effect descriptors produced by transitions and the context actions run in.
//!
//! An [`Effect`] is the one value a transition may hand back to the runtime:
//! do nothing, run an asynchronous action (optionally under a [`TaskId`] so it
//! can later be cancelled or replaced), or cancel a previously scheduled
//! action. Descriptors are produced fresh per transition and consumed
//! immediately; they are not retained and not cloneable.

use std::fmt;
use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use miette::Diagnostic;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::machine::Machine;
use crate::proxy::Proxy;
use crate::task::TaskId;

/// The boxed future an action resolves to.
pub type ActionFuture = BoxFuture<'static, Result<(), ActionError>>;

/// A boxed action: invoked once with its [`ActionContext`] when the runtime
/// launches the task.
pub type BoxedAction<M> = Box<dyn FnOnce(ActionContext<M>) -> ActionFuture + Send + 'static>;

/// Execution context handed to every effect action.
///
/// This is the only bridge a running task has back to its machine: events go
/// through the proxy, capabilities come from the environment, and the
/// cancellation token must be consulted at every suspension point.
///
/// # Cooperative Cancellation
///
/// Cancellation is advisory, never preemptive. An action that waits must
/// `select!` on `cancel.cancelled()` alongside the wait and unwind promptly
/// with [`ActionError::Cancelled`] when the token fires:
///
/// ```rust,no_run
/// # use std::time::Duration;
/// # use spindle::effect::{ActionContext, ActionError};
/// # use spindle::machine::Machine;
/// async fn wait_one_tick<M: Machine>(ctx: &ActionContext<M>) -> Result<(), ActionError> {
///     tokio::select! {
///         _ = ctx.cancel.cancelled() => Err(ActionError::Cancelled),
///         _ = tokio::time::sleep(Duration::from_secs(1)) => Ok(()),
///     }
/// }
/// ```
pub struct ActionContext<M: Machine> {
    /// Feedback channel into the owning machine.
    pub proxy: Proxy<M>,
    /// The machine's capability bundle.
    pub env: M::Env,
    /// Fires when this task is cancelled, replaced, or the machine torn down.
    pub cancel: CancellationToken,
}

impl<M: Machine> fmt::Debug for ActionContext<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("proxy", &self.proxy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Zero-or-one asynchronous action for the runtime to interpret after a
/// reduction.
pub enum Effect<M: Machine> {
    /// No action.
    None,
    /// Launch `action` as an independent task. With an id, the task occupies
    /// that registry slot, cancelling any predecessor; without one it is
    /// fire-and-forget and only whole-machine teardown reaches it.
    Run {
        id: Option<TaskId>,
        action: BoxedAction<M>,
    },
    /// Cancel the task registered under `id`, if any.
    Cancel { id: TaskId },
}

impl<M: Machine> Effect<M> {
    /// No action. The explicit arm for every combination that should do
    /// nothing.
    #[must_use]
    pub fn none() -> Self {
        Effect::None
    }

    /// Run an untagged, fire-and-forget action.
    #[must_use]
    pub fn run<F, Fut>(action: F) -> Self
    where
        F: FnOnce(ActionContext<M>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Effect::Run {
            id: None,
            action: Box::new(move |ctx| action(ctx).boxed()),
        }
    }

    /// Run an action registered under `id`, cancelling and replacing any
    /// task currently holding that id.
    #[must_use]
    pub fn run_keyed<F, Fut>(id: impl Into<TaskId>, action: F) -> Self
    where
        F: FnOnce(ActionContext<M>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Effect::Run {
            id: Some(id.into()),
            action: Box::new(move |ctx| action(ctx).boxed()),
        }
    }

    /// Cancel the task registered under `id`; no-op if nothing holds it.
    #[must_use]
    pub fn cancel(id: impl Into<TaskId>) -> Self {
        Effect::Cancel { id: id.into() }
    }

    /// Whether this effect does nothing.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Effect::None)
    }

    /// The task id this effect addresses, if any.
    #[must_use]
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Effect::None => None,
            Effect::Run { id, .. } => id.as_ref(),
            Effect::Cancel { id } => Some(id),
        }
    }
}

impl<M: Machine> fmt::Debug for Effect<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Run { id, .. } => f
                .debug_struct("Effect::Run")
                .field("id", id)
                .finish_non_exhaustive(),
            Effect::Cancel { id } => f.debug_struct("Effect::Cancel").field("id", id).finish(),
        }
    }
}

/// Errors an effect action can resolve with.
#[derive(Debug, Error, Diagnostic)]
pub enum ActionError {
    /// The action observed its cancellation token and unwound. Expected
    /// outcome of cancellation; the runtime never treats it as a failure.
    #[error("action cancelled before completion")]
    #[diagnostic(code(spindle::effect::cancelled))]
    Cancelled,

    /// A collaborator the action called into failed.
    #[error("capability error ({capability}): {message}")]
    #[diagnostic(
        code(spindle::effect::capability),
        help("The failure came from an external collaborator, not the machine itself.")
    )]
    Capability {
        capability: &'static str,
        message: String,
    },

    /// The action itself failed.
    #[error("action failed: {0}")]
    #[diagnostic(code(spindle::effect::failed))]
    Failed(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn capability(capability: &'static str, message: impl Into<String>) -> Self {
        Self::Capability {
            capability,
            message: message.into(),
        }
    }

    /// Whether this is the expected cancellation unwind.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
