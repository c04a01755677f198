//! The transition-function contract at the heart of every machine.
//!
//! A [`Machine`] is a deterministic transducer: a pure `update` function over
//! `(state, event)` pairs that may, per transition, describe at most one
//! asynchronous side effect for the runtime to interpret. The runtime owns the
//! state and calls `update` from a single serialized loop, so implementations
//! never deal with locking or interleaving.
//!
//! # Design Principles
//!
//! - **Pure**: `update` must be deterministic and non-blocking. All I/O goes
//!   through the returned [`Effect`].
//! - **Exhaustive**: match on every `(state variant, event variant)`
//!   combination. Combinations that should do nothing get an explicit
//!   [`Effect::none()`] arm; the compiler refuses partial coverage, which is
//!   what keeps a forgotten case from becoming a silent bug.
//! - **Single writer**: the reducer loop is the only caller of `update`; state
//!   is never mutated concurrently.
//!
//! # Examples
//!
//! ```rust
//! use spindle::effect::Effect;
//! use spindle::machine::{Machine, MachineState};
//!
//! #[derive(Clone, Debug, PartialEq, Eq)]
//! enum Light {
//!     Green,
//!     Red,
//!     Off,
//! }
//!
//! impl MachineState for Light {
//!     fn is_terminal(&self) -> bool {
//!         matches!(self, Light::Off)
//!     }
//! }
//!
//! #[derive(Debug)]
//! enum Signal {
//!     Flip,
//!     PowerDown,
//! }
//!
//! struct TrafficLight;
//!
//! impl Machine for TrafficLight {
//!     type State = Light;
//!     type Event = Signal;
//!     type Env = ();
//!
//!     fn update(state: &mut Light, event: Signal) -> Effect<Self> {
//!         match (state.clone(), event) {
//!             (Light::Green, Signal::Flip) => {
//!                 *state = Light::Red;
//!                 Effect::none()
//!             }
//!             (Light::Red, Signal::Flip) => {
//!                 *state = Light::Green;
//!                 Effect::none()
//!             }
//!             (Light::Green | Light::Red, Signal::PowerDown) => {
//!                 *state = Light::Off;
//!                 Effect::none()
//!             }
//!             // Terminal state ignores everything.
//!             (Light::Off, _) => Effect::none(),
//!         }
//!     }
//! }
//!
//! let mut state = Light::Green;
//! let effect = TrafficLight::update(&mut state, Signal::Flip);
//! assert_eq!(state, Light::Red);
//! assert!(effect.is_none());
//! ```

use std::fmt;

use crate::effect::Effect;

/// State held by a machine instance.
///
/// States form a closed set of variants (an enum in practice). The runtime
/// clones the state after each reduction to publish it on the watch surface,
/// and consults [`is_terminal`](MachineState::is_terminal) to decide when the
/// machine is finished.
pub trait MachineState: Clone + fmt::Debug + Send + Sync + 'static {
    /// Whether this state ends the machine's life. Once a reduction leaves the
    /// state terminal, the runtime cancels every registered task, stops
    /// reducing, and rejects further deliveries.
    fn is_terminal(&self) -> bool;
}

/// A deterministic state machine whose transitions can schedule cancellable
/// asynchronous effects.
///
/// Implementors are usually zero-sized marker types; the interesting parts
/// live in the associated `State`/`Event` enums and the `update` function.
/// Spawn instances with [`MachineBuilder`](crate::runtime::MachineBuilder).
pub trait Machine: Sized + 'static {
    /// The machine's configuration space. Owned exclusively by the runtime.
    type State: MachineState;

    /// Stimuli the machine reacts to. Consumed by value, one per reduction.
    type Event: Send + fmt::Debug + 'static;

    /// Capability bundle handed to every effect action (clients, clocks,
    /// settings). Use `()` when actions need nothing beyond the proxy.
    type Env: Clone + Send + Sync + 'static;

    /// Apply one event to the state, returning the effect to interpret.
    ///
    /// Must return in bounded time: no blocking, no I/O, no awaiting. The
    /// returned [`Effect`] is interpreted by the runtime before the next
    /// event is dequeued, as part of the same reduction step.
    fn update(state: &mut Self::State, event: Self::Event) -> Effect<Self>;
}
