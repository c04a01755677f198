//! Task identity and the in-flight task registry.
//!
//! Every keyed effect occupies exactly one registry slot per [`TaskId`].
//! Launching under an occupied id cancels the predecessor before the
//! successor is registered, and completions are generation-checked so a
//! replaced task's late exit can never evict its successor's entry.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Stable identifier scoping one slot in the task registry.
///
/// Ids are plain strings; pick something descriptive and unique within the
/// machine, such as the name of the activity the task performs.
///
/// # Examples
///
/// ```rust
/// use spindle::task::TaskId;
///
/// let id = TaskId::new("timer");
/// assert_eq!(id.as_str(), "timer");
/// assert_eq!(id, TaskId::from("timer"));
/// assert_eq!(id.to_string(), "timer");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered task: the generation it was launched under and the token
/// that cancels it.
struct TaskEntry {
    generation: u64,
    cancel: CancellationToken,
}

/// Registry of in-flight keyed tasks for a single machine instance.
///
/// Mutated only from the reducer loop, so the single-task-per-id invariant
/// holds without further coordination; other threads get snapshot reads.
pub(crate) struct TaskRegistry {
    entries: FxHashMap<TaskId, TaskEntry>,
    next_generation: u64,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            next_generation: 0,
        }
    }

    /// Make room for a new task under `id`: cancel any predecessor and hand
    /// out the generation the successor will be registered with.
    ///
    /// Cancellation of the predecessor is requested here, before the caller
    /// spawns the successor; the predecessor's teardown may still be running
    /// when the successor starts, which the generation check tolerates.
    pub(crate) fn prepare(&mut self, id: &TaskId) -> u64 {
        self.cancel(id);
        self.next_generation += 1;
        self.next_generation
    }

    /// Record a freshly spawned task. Must be paired with a prior
    /// [`prepare`](Self::prepare) call for the same id.
    pub(crate) fn register(&mut self, id: TaskId, generation: u64, cancel: CancellationToken) {
        let previous = self.entries.insert(id, TaskEntry { generation, cancel });
        debug_assert!(previous.is_none(), "registry slot occupied at register");
    }

    /// Signal cancellation for `id` and drop its entry. Returns whether a
    /// task was registered under that id.
    pub(crate) fn cancel(&mut self, id: &TaskId) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the entry for a task that finished on its own, but only if it
    /// still owns the slot. A stale generation means the task was replaced
    /// and its successor's entry must survive.
    pub(crate) fn finish(&mut self, id: &TaskId, generation: u64) -> bool {
        match self.entries.get(id) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(id);
                true
            }
            _ => false,
        }
    }

    /// Cancel everything. Used when the machine reaches a terminal state or
    /// is torn down.
    pub(crate) fn cancel_all(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.cancel.cancel();
        }
    }

    /// Snapshot of the currently registered ids.
    pub(crate) fn ids(&self) -> Vec<TaskId> {
        self.entries.keys().cloned().collect()
    }
}
