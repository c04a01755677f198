//! Construction entry point for machine instances.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::machine::Machine;
use crate::proxy::Proxy;
use crate::runtime::config::{RuntimeConfig, TaskErrorPolicy};
use crate::runtime::handle::MachineHandle;
use crate::runtime::reducer::{self, LoopContext};
use crate::task::TaskRegistry;

/// Builder for one machine instance.
///
/// Each spawn produces a fully isolated machine: its own state, mailbox,
/// task registry, and proxies. Nothing is shared process-wide, so any number
/// of instances of the same machine type can run side by side.
///
/// # Examples
///
/// ```rust,no_run
/// # use spindle::machine::{Machine, MachineState};
/// # use spindle::effect::Effect;
/// # use spindle::runtime::MachineBuilder;
/// # #[derive(Clone, Debug)]
/// # struct S;
/// # impl MachineState for S { fn is_terminal(&self) -> bool { false } }
/// # struct M;
/// # impl Machine for M {
/// #     type State = S;
/// #     type Event = ();
/// #     type Env = ();
/// #     fn update(_: &mut S, _: ()) -> Effect<Self> { Effect::none() }
/// # }
/// # async fn example() {
/// let handle = MachineBuilder::<M>::new(S, ())
///     .with_machine_id("demo")
///     .spawn();
/// handle.send(()).unwrap();
/// # }
/// ```
pub struct MachineBuilder<M: Machine> {
    initial: M::State,
    env: M::Env,
    config: RuntimeConfig<M>,
}

impl<M: Machine> MachineBuilder<M> {
    /// Start building a machine from its initial state and capability
    /// bundle.
    pub fn new(initial: M::State, env: M::Env) -> Self {
        Self {
            initial,
            env,
            config: RuntimeConfig::default(),
        }
    }

    /// Override the generated machine id used in tracing spans.
    #[must_use]
    pub fn with_machine_id(mut self, machine_id: impl Into<String>) -> Self {
        self.config.machine_id = machine_id.into();
        self
    }

    /// Choose what happens when an effect task fails.
    #[must_use]
    pub fn on_task_error(mut self, policy: TaskErrorPolicy<M>) -> Self {
        self.config.on_task_error = policy;
        self
    }

    /// Replace the whole configuration at once.
    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig<M>) -> Self {
        self.config = config;
        self
    }

    /// Spawn the reducer loop and return the live handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> MachineHandle<M> {
        let (tx, rx) = flume::unbounded();
        let terminated = Arc::new(AtomicBool::new(false));
        let registry = Arc::new(Mutex::new(TaskRegistry::new()));
        let (state_tx, state_rx) = watch::channel(self.initial.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let root_cancel = CancellationToken::new();

        let proxy = Proxy {
            tx: tx.clone(),
            terminated: Arc::clone(&terminated),
        };

        let machine_id = self.config.machine_id.clone();
        let span = tracing::info_span!("machine", machine_id = %machine_id);

        let loop_ctx = LoopContext {
            state: self.initial,
            env: self.env,
            config: self.config,
            mailbox: rx,
            feedback: tx,
            proxy: proxy.clone(),
            registry: Arc::clone(&registry),
            terminated,
            state_tx,
            shutdown_rx,
            root_cancel,
        };
        let join_handle = tokio::spawn(reducer::drive(loop_ctx).instrument(span));

        MachineHandle {
            proxy,
            state_rx,
            registry,
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
            machine_id,
        }
    }
}
