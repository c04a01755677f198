//! The effect runtime: spawning, driving, observing, and tearing down
//! machine instances.
//!
//! # Architecture
//!
//! Each spawned machine gets one serialized reducer loop (a tokio task) that
//! owns the state outright. Event deliveries, external or fed back by
//! running effect tasks, enter a single FIFO mailbox and are reduced one at
//! a time; the effect returned by each reduction is interpreted before the
//! next event is dequeued. Effect tasks run as independent tokio tasks,
//! tracked in a per-machine registry keyed by [`TaskId`], and interact with
//! the machine only through their [`Proxy`].
//!
//! - **[`MachineBuilder`]** - construction entry point
//! - **[`MachineHandle`]** - state snapshots, proxies, join/shutdown
//! - **[`RuntimeConfig`] / [`TaskErrorPolicy`]** - per-machine options
//!
//! [`TaskId`]: crate::task::TaskId
//! [`Proxy`]: crate::proxy::Proxy

pub mod builder;
pub mod config;
pub mod handle;
mod reducer;

pub use builder::MachineBuilder;
pub use config::{RuntimeConfig, TaskErrorPolicy, TaskFailure};
pub use handle::{MachineHandle, RuntimeError};
