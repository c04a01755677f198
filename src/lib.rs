//! # Spindle: Deterministic State Machines with Cancellable Async Effects
//!
//! Spindle is a small runtime for typed state machines ("transducers") whose
//! transitions can schedule named, cancellable, long-running asynchronous
//! side effects that feed events back into the same machine.
//!
//! ## Core Concepts
//!
//! - **Machine**: a pure `update(state, event) -> effect` function over
//!   closed sets of state and event variants
//! - **Effect**: the per-transition descriptor: do nothing, run an async
//!   action (optionally under a stable task id), or cancel one
//! - **Runtime**: one serialized reducer loop per machine instance; effects
//!   become tracked tokio tasks with cooperative cancellation
//! - **Proxy**: the write-only feedback handle a running task uses to
//!   deliver events, inert once the machine terminates
//!
//! ## Quick Start
//!
//! A timer that ticks while running, counts pings, and shuts its task down
//! when stopped or terminated:
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use spindle::effect::{ActionError, Effect};
//! use spindle::machine::{Machine, MachineState};
//! use spindle::runtime::MachineBuilder;
//!
//! #[derive(Clone, Debug, PartialEq, Eq)]
//! enum TimerState {
//!     Stopped { count: u32 },
//!     Running { count: u32 },
//!     Terminated { count: u32 },
//! }
//!
//! impl MachineState for TimerState {
//!     fn is_terminal(&self) -> bool {
//!         matches!(self, TimerState::Terminated { .. })
//!     }
//! }
//!
//! #[derive(Debug)]
//! enum TimerEvent {
//!     Start,
//!     Ping,
//!     Stop,
//!     Terminate,
//! }
//!
//! #[derive(Clone, Debug)]
//! struct TimerEnv {
//!     interval: Duration,
//! }
//!
//! struct Timer;
//!
//! impl Machine for Timer {
//!     type State = TimerState;
//!     type Event = TimerEvent;
//!     type Env = TimerEnv;
//!
//!     fn update(state: &mut TimerState, event: TimerEvent) -> Effect<Self> {
//!         match (state.clone(), event) {
//!             (TimerState::Stopped { count }, TimerEvent::Start) => {
//!                 *state = TimerState::Running { count };
//!                 Effect::run_keyed("timer", |ctx: spindle::effect::ActionContext<Timer>| async move {
//!                     loop {
//!                         tokio::select! {
//!                             _ = ctx.cancel.cancelled() => return Err(ActionError::Cancelled),
//!                             _ = tokio::time::sleep(ctx.env.interval) => {
//!                                 if ctx.proxy.send(TimerEvent::Ping).is_err() {
//!                                     return Ok(());
//!                                 }
//!                             }
//!                         }
//!                     }
//!                 })
//!             }
//!             (TimerState::Running { count }, TimerEvent::Ping) => {
//!                 *state = TimerState::Running { count: count + 1 };
//!                 Effect::none()
//!             }
//!             (TimerState::Running { count }, TimerEvent::Stop) => {
//!                 *state = TimerState::Stopped { count };
//!                 Effect::cancel("timer")
//!             }
//!             (
//!                 TimerState::Stopped { count } | TimerState::Running { count },
//!                 TimerEvent::Terminate,
//!             ) => {
//!                 // The runtime cancels anything still registered as part
//!                 // of this same transition.
//!                 *state = TimerState::Terminated { count };
//!                 Effect::none()
//!             }
//!             // Explicit no-ops: already running, already stopped, late
//!             // pings, anything after terminal.
//!             (TimerState::Running { .. }, TimerEvent::Start)
//!             | (TimerState::Stopped { .. }, TimerEvent::Stop)
//!             | (TimerState::Stopped { .. }, TimerEvent::Ping)
//!             | (TimerState::Terminated { .. }, _) => Effect::none(),
//!         }
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = MachineBuilder::<Timer>::new(
//!     TimerState::Stopped { count: 0 },
//!     TimerEnv { interval: Duration::from_millis(250) },
//! )
//! .spawn();
//!
//! handle.send(TimerEvent::Start)?;
//! tokio::time::sleep(Duration::from_secs(1)).await;
//! handle.send(TimerEvent::Terminate)?;
//!
//! let final_state = handle.join().await?;
//! println!("ended in {final_state:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - Reductions are totally ordered and non-overlapping; FIFO arrival order
//!   is reduction order, for external and task-fed events alike
//! - At most one task is active per [`task::TaskId`]; launching under an
//!   occupied id cancels the predecessor before the successor starts
//! - A terminal state empties the task registry as part of the same
//!   transition and turns every [`proxy::Proxy`] inert; late sends fail
//!   loudly instead of disappearing
//! - Cancellation is cooperative: actions observe their token at suspension
//!   points and unwind; nothing is preempted mid-instruction
//!
//! ## Module Guide
//!
//! - [`machine`] - The `Machine`/`MachineState` transition contract
//! - [`effect`] - Effect descriptors, action context, action errors
//! - [`task`] - Task identity
//! - [`proxy`] - The event feedback channel
//! - [`runtime`] - Builder, handle, configuration, and the reducer loop

pub mod effect;
pub mod machine;
pub mod proxy;
pub mod runtime;
pub mod task;
