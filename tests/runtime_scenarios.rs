mod common;

use common::{TIMER_TASK, TimerEnv, TimerEvent, TimerMachine, TimerState, wait_for_state};
use spindle::machine::MachineState;
use spindle::runtime::MachineBuilder;
use spindle::task::TaskId;

fn manual_timer() -> spindle::runtime::MachineHandle<TimerMachine> {
    MachineBuilder::<TimerMachine>::new(TimerState::Stopped { count: 0 }, TimerEnv::manual())
        .spawn()
}

#[tokio::test]
async fn full_timer_lifecycle() {
    let handle = manual_timer();

    // Start registers the tick task.
    handle.send(TimerEvent::Start).unwrap();
    let state = wait_for_state(&handle, |s| matches!(s, TimerState::Running { .. })).await;
    assert_eq!(state, TimerState::Running { count: 0 });
    assert_eq!(handle.active_tasks(), vec![TaskId::from(TIMER_TASK)]);

    // Pings bump the count.
    handle.send(TimerEvent::Ping).unwrap();
    wait_for_state(&handle, |s| *s == TimerState::Running { count: 1 }).await;

    // Stop cancels the tick task in the same reduction.
    handle.send(TimerEvent::Stop).unwrap();
    wait_for_state(&handle, |s| *s == TimerState::Stopped { count: 1 }).await;
    assert!(handle.active_tasks().is_empty());

    // Terminate ends the machine; the registry stays empty.
    handle.send(TimerEvent::Terminate).unwrap();
    wait_for_state(&handle, TimerState::is_terminal).await;
    assert!(handle.active_tasks().is_empty());
    assert!(handle.is_terminated());

    // Further deliveries are rejected, not reduced.
    assert!(handle.send(TimerEvent::Ping).is_err());
    assert!(handle.send(TimerEvent::Start).is_err());

    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state, TimerState::Terminated { count: 1 });
}

#[tokio::test]
async fn terminate_while_running_cancels_tick_task() {
    let handle = manual_timer();

    handle.send(TimerEvent::Start).unwrap();
    wait_for_state(&handle, |s| matches!(s, TimerState::Running { .. })).await;
    assert_eq!(handle.active_tasks().len(), 1);

    // The registry entry is removed as part of the terminal transition.
    handle.send(TimerEvent::Terminate).unwrap();
    wait_for_state(&handle, TimerState::is_terminal).await;
    assert!(handle.active_tasks().is_empty());

    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state, TimerState::Terminated { count: 0 });
}

#[tokio::test]
async fn start_while_running_is_a_noop() {
    let handle = manual_timer();

    handle.send(TimerEvent::Start).unwrap();
    wait_for_state(&handle, |s| matches!(s, TimerState::Running { .. })).await;

    // A second Start must not reset the count or register a duplicate task.
    handle.send(TimerEvent::Start).unwrap();
    handle.send(TimerEvent::Ping).unwrap();
    wait_for_state(&handle, |s| *s == TimerState::Running { count: 1 }).await;
    assert_eq!(handle.active_tasks().len(), 1);

    handle.send(TimerEvent::Terminate).unwrap();
    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state, TimerState::Terminated { count: 1 });
}

#[tokio::test]
async fn stop_while_stopped_is_a_noop() {
    let handle = manual_timer();

    handle.send(TimerEvent::Stop).unwrap();
    handle.send(TimerEvent::Stop).unwrap();
    handle.send(TimerEvent::Ping).unwrap();
    handle.send(TimerEvent::Terminate).unwrap();

    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state, TimerState::Terminated { count: 0 });
}

#[tokio::test]
async fn ticks_feed_back_into_the_machine() {
    let handle = MachineBuilder::<TimerMachine>::new(
        TimerState::Stopped { count: 0 },
        TimerEnv::fast(),
    )
    .spawn();

    handle.send(TimerEvent::Start).unwrap();
    let state = wait_for_state(&handle, |s| s.count() >= 3).await;
    assert!(matches!(state, TimerState::Running { .. }));

    handle.send(TimerEvent::Stop).unwrap();
    wait_for_state(&handle, |s| matches!(s, TimerState::Stopped { .. })).await;
    assert!(handle.active_tasks().is_empty());

    handle.send(TimerEvent::Terminate).unwrap();
    handle.join().await.unwrap();
}

#[tokio::test]
async fn events_queued_behind_terminate_are_dropped() {
    let handle = manual_timer();

    handle.send(TimerEvent::Start).unwrap();
    handle.send(TimerEvent::Ping).unwrap();
    handle.send(TimerEvent::Terminate).unwrap();
    // These race the terminal transition: they are either rejected at the
    // proxy or dropped unreduced. Either way the count must not move.
    let _ = handle.send(TimerEvent::Ping);
    let _ = handle.send(TimerEvent::Ping);

    let final_state = handle.join().await.unwrap();
    assert_eq!(final_state, TimerState::Terminated { count: 1 });
}

#[tokio::test]
async fn machine_instances_are_isolated() {
    let first = manual_timer();
    let second = manual_timer();

    first.send(TimerEvent::Start).unwrap();
    wait_for_state(&first, |s| matches!(s, TimerState::Running { .. })).await;

    // The sibling instance saw none of that.
    assert_eq!(second.state(), TimerState::Stopped { count: 0 });
    assert!(second.active_tasks().is_empty());

    first.send(TimerEvent::Terminate).unwrap();
    second.send(TimerEvent::Terminate).unwrap();
    assert_eq!(
        first.join().await.unwrap(),
        TimerState::Terminated { count: 0 }
    );
    assert_eq!(
        second.join().await.unwrap(),
        TimerState::Terminated { count: 0 }
    );
}
