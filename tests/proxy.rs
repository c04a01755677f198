mod common;

use std::time::Duration;

use common::{TimerEnv, TimerEvent, TimerMachine, TimerState, wait_for_state, wait_until};
use spindle::effect::Effect;
use spindle::machine::{Machine, MachineState};
use spindle::proxy::ProxyError;
use spindle::runtime::MachineBuilder;

#[tokio::test]
async fn proxy_rejects_delivery_after_terminal_state() {
    let handle = MachineBuilder::<TimerMachine>::new(
        TimerState::Stopped { count: 0 },
        TimerEnv::manual(),
    )
    .spawn();
    let proxy = handle.proxy();

    handle.send(TimerEvent::Start).unwrap();
    handle.send(TimerEvent::Terminate).unwrap();
    wait_for_state(&handle, MachineState::is_terminal).await;

    // A proxy held by a task (or anyone) fails loudly after terminal; the
    // event never reaches the transition function.
    assert!(matches!(
        proxy.send(TimerEvent::Ping),
        Err(ProxyError::MachineTerminated)
    ));
    assert!(proxy.is_terminated());

    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state, TimerState::Terminated { count: 0 });
}

#[tokio::test]
async fn proxy_rejects_delivery_after_shutdown() {
    let handle = MachineBuilder::<TimerMachine>::new(
        TimerState::Stopped { count: 0 },
        TimerEnv::manual(),
    )
    .spawn();
    let proxy = handle.proxy();

    handle.send(TimerEvent::Start).unwrap();
    wait_for_state(&handle, |s| matches!(s, TimerState::Running { .. })).await;

    let last_state = handle.shutdown().await.unwrap();
    assert_eq!(last_state, TimerState::Running { count: 0 });
    assert!(matches!(
        proxy.send(TimerEvent::Ping),
        Err(ProxyError::MachineTerminated)
    ));
}

#[tokio::test]
async fn dropping_the_handle_tears_the_machine_down() {
    let proxy = {
        let handle = MachineBuilder::<TimerMachine>::new(
            TimerState::Stopped { count: 0 },
            TimerEnv::manual(),
        )
        .spawn();
        handle.proxy()
    };

    wait_until("dropped handle seals the machine", || proxy.is_terminated()).await;
    assert!(proxy.send(TimerEvent::Start).is_err());
}

/// Machine that records the order events reached it.
struct TraceMachine;

#[derive(Clone, Debug, PartialEq, Eq)]
struct TraceState {
    seen: Vec<u32>,
    done: bool,
}

impl MachineState for TraceState {
    fn is_terminal(&self) -> bool {
        self.done
    }
}

#[derive(Debug)]
enum TraceEvent {
    Mark(u32),
    Finish,
}

impl Machine for TraceMachine {
    type State = TraceState;
    type Event = TraceEvent;
    type Env = ();

    fn update(state: &mut TraceState, event: TraceEvent) -> Effect<Self> {
        match event {
            TraceEvent::Mark(n) => {
                state.seen.push(n);
                Effect::none()
            }
            TraceEvent::Finish => {
                state.done = true;
                Effect::none()
            }
        }
    }
}

#[tokio::test]
async fn concurrent_senders_preserve_arrival_order() {
    let handle = MachineBuilder::<TraceMachine>::new(
        TraceState {
            seen: Vec::new(),
            done: false,
        },
        (),
    )
    .spawn();

    let total = 20u32;
    let mut senders = Vec::new();
    for i in 0..total {
        let proxy = handle.proxy();
        senders.push(tokio::spawn(async move {
            // Stagger sends to establish a deterministic arrival order.
            tokio::time::sleep(Duration::from_millis(u64::from(i) * 5)).await;
            proxy.send(TraceEvent::Mark(i)).expect("machine is live");
        }));
    }
    for sender in senders {
        sender.await.expect("sender task");
    }

    handle.send(TraceEvent::Finish).unwrap();
    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state.seen, (0..total).collect::<Vec<_>>());
}

#[tokio::test]
async fn sends_from_one_sender_stay_in_order() {
    let handle = MachineBuilder::<TraceMachine>::new(
        TraceState {
            seen: Vec::new(),
            done: false,
        },
        (),
    )
    .spawn();
    let proxy = handle.proxy();

    for i in 0..100 {
        proxy.send(TraceEvent::Mark(i)).unwrap();
    }
    handle.send(TraceEvent::Finish).unwrap();

    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state.seen, (0..100).collect::<Vec<_>>());
}
