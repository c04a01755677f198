//! The serialized reducer loop behind every machine instance.
//!
//! One spawned task per machine drains the FIFO mailbox, applies the
//! transition function, and interprets the returned effect before the next
//! envelope is dequeued. Reductions are therefore totally ordered and
//! non-overlapping, and the task registry is only ever touched in step with
//! them.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::effect::{ActionContext, ActionError, Effect};
use crate::machine::{Machine, MachineState};
use crate::proxy::{Envelope, Proxy};
use crate::runtime::config::{RuntimeConfig, TaskErrorPolicy, TaskFailure};
use crate::task::TaskRegistry;

const REGISTRY_POISONED: &str = "task registry poisoned";

/// Everything the loop owns or shares; assembled by the builder.
pub(crate) struct LoopContext<M: Machine> {
    pub(crate) state: M::State,
    pub(crate) env: M::Env,
    pub(crate) config: RuntimeConfig<M>,
    pub(crate) mailbox: flume::Receiver<Envelope<M>>,
    /// Sender side of the mailbox, cloned into spawned tasks for completion
    /// notices and escalated failures.
    pub(crate) feedback: flume::Sender<Envelope<M>>,
    pub(crate) proxy: Proxy<M>,
    pub(crate) registry: Arc<Mutex<TaskRegistry>>,
    pub(crate) terminated: Arc<AtomicBool>,
    pub(crate) state_tx: watch::Sender<M::State>,
    pub(crate) shutdown_rx: oneshot::Receiver<()>,
    pub(crate) root_cancel: CancellationToken,
}

/// Drive one machine to its end: terminal state or teardown. Returns the
/// final state.
pub(crate) async fn drive<M: Machine>(ctx: LoopContext<M>) -> M::State {
    let LoopContext {
        mut state,
        env,
        config,
        mailbox,
        feedback,
        proxy,
        registry,
        terminated,
        state_tx,
        mut shutdown_rx,
        root_cancel,
    } = ctx;

    loop {
        tokio::select! {
            biased;

            // Teardown preempts still-queued events: the transition function
            // is never invoked again once shutdown is requested.
            _ = &mut shutdown_rx => {
                debug!("teardown requested; cancelling all tasks");
                seal(&registry, &terminated, &root_cancel);
                break;
            }

            received = mailbox.recv_async() => {
                // The loop holds a sender, so the channel cannot disconnect
                // while we are alive; treat it as teardown if it somehow does.
                let Ok(envelope) = received else {
                    seal(&registry, &terminated, &root_cancel);
                    break;
                };

                match envelope {
                    Envelope::Event(event) => {
                        debug!(?event, "reducing event");
                        let effect = M::update(&mut state, event);
                        interpret(effect, &env, &proxy, &feedback, &registry, &root_cancel);
                        // Seal before publishing, so an observer of the
                        // terminal state already sees an empty registry and
                        // inert proxies.
                        let terminal = state.is_terminal();
                        if terminal {
                            debug!(state = ?state, "terminal state reached; cancelling remaining tasks");
                            seal(&registry, &terminated, &root_cancel);
                        }
                        state_tx.send_replace(state.clone());
                        if terminal {
                            drain_dropped(&mailbox);
                            break;
                        }
                    }
                    Envelope::TaskDone { id, generation, outcome } => {
                        if let Some(id) = &id {
                            registry.lock().expect(REGISTRY_POISONED).finish(id, generation);
                        }
                        match outcome {
                            Ok(()) => trace!(task = ?id, "task completed"),
                            Err(ActionError::Cancelled) => {
                                trace!(task = ?id, "task unwound after cancellation");
                            }
                            Err(error) => match &config.on_task_error {
                                TaskErrorPolicy::LogAndContinue => {
                                    warn!(task = ?id, %error, "effect task failed; continuing");
                                }
                                TaskErrorPolicy::Escalate(map) => {
                                    let event = map(TaskFailure { id, error });
                                    let _ = feedback.send(Envelope::Event(event));
                                }
                            },
                        }
                    }
                }
            }
        }
    }

    state
}

/// Interpret one effect descriptor as part of the current reduction step.
fn interpret<M: Machine>(
    effect: Effect<M>,
    env: &M::Env,
    proxy: &Proxy<M>,
    feedback: &flume::Sender<Envelope<M>>,
    registry: &Arc<Mutex<TaskRegistry>>,
    root_cancel: &CancellationToken,
) {
    match effect {
        Effect::None => {}
        Effect::Cancel { id } => {
            let removed = registry.lock().expect(REGISTRY_POISONED).cancel(&id);
            if removed {
                trace!(task = %id, "cancelled task");
            } else {
                trace!(task = %id, "cancel for unregistered task ignored");
            }
        }
        Effect::Run { id, action } => {
            // Child of the machine-wide token, so whole-machine teardown
            // reaches even fire-and-forget tasks.
            let cancel = root_cancel.child_token();
            let action_ctx = ActionContext {
                proxy: proxy.clone(),
                env: env.clone(),
                cancel: cancel.clone(),
            };
            match id {
                Some(id) => {
                    // Predecessor cancellation is requested in prepare(),
                    // before the successor is spawned. Its teardown may race
                    // the successor's startup; the generation check keeps the
                    // late completion from evicting the new entry.
                    let generation = registry.lock().expect(REGISTRY_POISONED).prepare(&id);
                    trace!(task = %id, generation, "launching task");
                    let feedback = feedback.clone();
                    let done_id = id.clone();
                    tokio::spawn(async move {
                        let outcome = action(action_ctx).await;
                        let _ = feedback.send(Envelope::TaskDone {
                            id: Some(done_id),
                            generation,
                            outcome,
                        });
                    });
                    registry
                        .lock()
                        .expect(REGISTRY_POISONED)
                        .register(id, generation, cancel);
                }
                None => {
                    trace!("launching fire-and-forget task");
                    let feedback = feedback.clone();
                    tokio::spawn(async move {
                        let outcome = action(action_ctx).await;
                        let _ = feedback.send(Envelope::TaskDone {
                            id: None,
                            generation: 0,
                            outcome,
                        });
                    });
                }
            }
        }
    }
}

/// Log events that were already queued when the machine went terminal. Their
/// senders were told delivery succeeded, so the drop is made visible here.
fn drain_dropped<M: Machine>(mailbox: &flume::Receiver<Envelope<M>>) {
    while let Ok(envelope) = mailbox.try_recv() {
        if let Envelope::Event(event) = envelope {
            debug!(?event, "event dropped after terminal state");
        }
    }
}

/// Flip the tombstone and cancel every task. After this, proxies report
/// `MachineTerminated` and the registry is empty for good.
fn seal(
    registry: &Arc<Mutex<TaskRegistry>>,
    terminated: &Arc<AtomicBool>,
    root_cancel: &CancellationToken,
) {
    terminated.store(true, Ordering::Release);
    root_cancel.cancel();
    registry.lock().expect(REGISTRY_POISONED).cancel_all();
}
