#![allow(dead_code)]

use std::time::Duration;

use spindle::effect::{ActionError, Effect};
use spindle::machine::{Machine, MachineState};

/// Registry id the timer machine runs its tick task under.
pub const TIMER_TASK: &str = "timer";

/// The reference timer machine: ticks while running, counts pings, and is
/// done for good once terminated.
pub struct TimerMachine;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerState {
    Stopped { count: u32 },
    Running { count: u32 },
    Terminated { count: u32 },
}

impl MachineState for TimerState {
    fn is_terminal(&self) -> bool {
        matches!(self, TimerState::Terminated { .. })
    }
}

impl TimerState {
    pub fn count(&self) -> u32 {
        match self {
            TimerState::Stopped { count }
            | TimerState::Running { count }
            | TimerState::Terminated { count } => *count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    Start,
    Ping,
    Stop,
    Terminate,
}

#[derive(Clone, Debug)]
pub struct TimerEnv {
    pub interval: Duration,
}

impl TimerEnv {
    /// An interval long enough that ticks never fire during a test; pings
    /// are delivered manually instead.
    pub fn manual() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }

    pub fn fast() -> Self {
        Self {
            interval: Duration::from_millis(10),
        }
    }
}

impl Machine for TimerMachine {
    type State = TimerState;
    type Event = TimerEvent;
    type Env = TimerEnv;

    fn update(state: &mut TimerState, event: TimerEvent) -> Effect<Self> {
        match (state.clone(), event) {
            (TimerState::Stopped { count }, TimerEvent::Start) => {
                *state = TimerState::Running { count };
                Effect::run_keyed(TIMER_TASK, |ctx: spindle::effect::ActionContext<TimerMachine>| async move {
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
                Effect::cancel(TIMER_TASK)
            }
            (
                TimerState::Stopped { count } | TimerState::Running { count },
                TimerEvent::Terminate,
            ) => {
                *state = TimerState::Terminated { count };
                Effect::none()
            }
            // Explicit no-ops: idempotent start/stop, late pings, anything
            // after terminal.
            (TimerState::Running { .. }, TimerEvent::Start)
            | (TimerState::Stopped { .. }, TimerEvent::Stop)
            | (TimerState::Stopped { .. }, TimerEvent::Ping)
            | (TimerState::Terminated { .. }, _) => Effect::none(),
        }
    }
}
