#![allow(dead_code)]

use std::time::Duration;

use spindle::machine::Machine;
use spindle::runtime::MachineHandle;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait until the machine publishes a state matching `pred`, returning it.
///
/// Checks the latest published state first, so predicates that already hold
/// return immediately.
pub async fn wait_for_state<M, F>(handle: &MachineHandle<M>, pred: F) -> M::State
where
    M: Machine,
    F: Fn(&M::State) -> bool,
{
    let mut rx = handle.watch();
    tokio::time::timeout(WAIT_TIMEOUT, async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if pred(&snapshot) {
                return snapshot;
            }
            rx.changed()
                .await
                .expect("machine loop ended before predicate matched");
        }
    })
    .await
    .expect("timed out waiting for machine state")
}

/// Poll `pred` until it holds. For conditions that are not state-valued,
/// such as registry snapshots that settle after a completion notice.
pub async fn wait_until(label: &str, mut pred: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !pred() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting until {label}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
