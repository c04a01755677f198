//! Demo: A Ticking Timer Machine
//!
//! This demonstration drives the crate's reference machine end to end: a
//! timer that schedules a cancellable tick task while running, counts the
//! ticks it hears back, and tears everything down on termination.
//!
//! What You'll See:
//! 1. Spawning a machine with an initial state and environment
//! 2. A keyed effect task feeding events back through its proxy
//! 3. Idempotent edges: starting twice changes nothing
//! 4. Stop cancelling the tick task, terminate ending the machine
//!
//! Running This Demo:
//! ```bash
//! cargo run --example timer
//! ```

use std::time::Duration;

use spindle::effect::{ActionError, Effect};
use spindle::machine::{Machine, MachineState};
use spindle::runtime::MachineBuilder;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Debug, PartialEq, Eq)]
enum TimerState {
    Stopped { count: u32 },
    Running { count: u32 },
    Terminated { count: u32 },
}

impl MachineState for TimerState {
    fn is_terminal(&self) -> bool {
        matches!(self, TimerState::Terminated { .. })
    }
}

#[derive(Debug)]
enum TimerEvent {
    Start,
    Ping,
    Stop,
    Terminate,
}

#[derive(Clone, Debug)]
struct TimerEnv {
    interval: Duration,
}

struct Timer;

impl Machine for Timer {
    type State = TimerState;
    type Event = TimerEvent;
    type Env = TimerEnv;

    fn update(state: &mut TimerState, event: TimerEvent) -> Effect<Self> {
        match (state.clone(), event) {
            (TimerState::Stopped { count }, TimerEvent::Start) => {
                *state = TimerState::Running { count };
                Effect::run_keyed("timer", |ctx: spindle::effect::ActionContext<Timer>| async move {
                    loop {
                        tokio::select! {
                            _ = ctx.cancel.cancelled() => return Err(ActionError::Cancelled),
                            _ = tokio::time::sleep(ctx.env.interval) => {
                                if ctx.proxy.send(TimerEvent::Ping).is_err() {
                                    return Ok(());
                                }
                            }
                        }
                    }
                })
            }
            (TimerState::Running { count }, TimerEvent::Ping) => {
                *state = TimerState::Running { count: count + 1 };
                Effect::none()
            }
            (TimerState::Running { count }, TimerEvent::Stop) => {
                *state = TimerState::Stopped { count };
                Effect::cancel("timer")
            }
            (
                TimerState::Stopped { count } | TimerState::Running { count },
                TimerEvent::Terminate,
            ) => {
                *state = TimerState::Terminated { count };
                Effect::none()
            }
            (TimerState::Running { .. }, TimerEvent::Start)
            | (TimerState::Stopped { .. }, TimerEvent::Stop)
            | (TimerState::Stopped { .. }, TimerEvent::Ping)
            | (TimerState::Terminated { .. }, _) => Effect::none(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let handle = MachineBuilder::<Timer>::new(
        TimerState::Stopped { count: 0 },
        TimerEnv {
            interval: Duration::from_millis(200),
        },
    )
    .with_machine_id("timer-demo")
    .spawn();

    info!("starting the timer");
    handle.send(TimerEvent::Start)?;

    // Starting while already running is a no-op.
    handle.send(TimerEvent::Start)?;

    tokio::time::sleep(Duration::from_millis(1100)).await;
    info!(state = ?handle.state(), tasks = ?handle.active_tasks(), "after a second of ticking");

    info!("stopping the timer; the tick task is cancelled");
    handle.send(TimerEvent::Stop)?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    info!(state = ?handle.state(), tasks = ?handle.active_tasks(), "while stopped");

    info!("terminating the machine");
    handle.send(TimerEvent::Terminate)?;
    let final_state = handle.join().await?;
    info!(?final_state, "machine finished");

    Ok(())
}
