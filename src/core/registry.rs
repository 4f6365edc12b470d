//! # Task registry - the single source of truth for "what is running".
//!
//! Maps a [`TaskHandle`] to the [`TaskRecord`] that owns the task's cancellation
//! controller and the receiving end of its outcome channel.
//!
//! ## Architecture
//! ```text
//! Supervisor::spawn ──► allocate_and_insert(record) ──► handle
//! Supervisor::cancel ─► lookup(handle)              ──► CancellationToken
//! Supervisor::join ───► take(handle)                ──► TaskRecord (removed)
//! Supervisor::shutdown► drain()                     ──► every TaskRecord
//! ```
//!
//! ## Rules
//! - The handle counter and the map live behind the same mutex, so concurrent
//!   spawns can never hand out the same handle.
//! - Handles start at 1 and are never recycled; `0` is never a valid handle.
//! - Records leave the registry only through `take`/`drain` (join/shutdown).
//! - Worker threads never touch the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Opaque identifier of a live background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Wraps a raw integer received from a caller.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer handed to callers.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving end of a task's single-slot outcome channel.
pub(crate) type OutcomeRx = oneshot::Receiver<Result<(), TaskError>>;

/// Sending end of a task's single-slot outcome channel.
pub(crate) type OutcomeTx = oneshot::Sender<Result<(), TaskError>>;

/// Registry entry for one spawned task.
pub(crate) struct TaskRecord {
    /// Task name, for events.
    pub(crate) name: Arc<str>,
    /// Cancellation controller; cancelling is idempotent.
    pub(crate) cancel: CancellationToken,
    /// Receives exactly one outcome from the worker thread.
    pub(crate) outcome: OutcomeRx,
}

struct Inner {
    next: u64,
    tasks: HashMap<TaskHandle, TaskRecord>,
}

/// Mutex-guarded mapping from handle to record.
pub(crate) struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    /// Creates an empty registry; the first handle will be `1`.
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: 1,
                tasks: HashMap::new(),
            }),
        }
    }

    // A poisoned lock still guards a consistent map.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assigns the next handle to `record` and stores it, as one atomic step.
    pub(crate) fn allocate_and_insert(&self, record: TaskRecord) -> TaskHandle {
        let mut inner = self.lock();
        let handle = TaskHandle(inner.next);
        inner.next += 1;
        inner.tasks.insert(handle, record);
        handle
    }

    /// Returns the cancellation controller of a live task.
    pub(crate) fn lookup(&self, handle: TaskHandle) -> Option<CancellationToken> {
        self.lock().tasks.get(&handle).map(|r| r.cancel.clone())
    }

    /// Atomically removes and returns a record.
    pub(crate) fn take(&self, handle: TaskHandle) -> Option<TaskRecord> {
        self.lock().tasks.remove(&handle)
    }

    /// Removes and returns every record, ordered by handle.
    pub(crate) fn drain(&self) -> Vec<(TaskHandle, TaskRecord)> {
        let mut all: Vec<_> = self.lock().tasks.drain().collect();
        all.sort_unstable_by_key(|(h, _)| *h);
        all
    }

    /// Returns sorted list of live handles.
    pub(crate) fn handles(&self) -> Vec<TaskHandle> {
        let mut handles: Vec<TaskHandle> = self.lock().tasks.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub(crate) fn contains(&self, handle: TaskHandle) -> bool {
        self.lock().tasks.contains_key(&handle)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn record(name: &str) -> (TaskRecord, OutcomeTx) {
        let (tx, rx) = oneshot::channel();
        let rec = TaskRecord {
            name: Arc::from(name),
            cancel: CancellationToken::new(),
            outcome: rx,
        };
        (rec, tx)
    }

    #[test]
    fn test_handles_start_at_one_and_increase() {
        let reg = Registry::new();
        let (a, _ta) = record("a");
        let (b, _tb) = record("b");
        assert_eq!(reg.allocate_and_insert(a), TaskHandle(1));
        assert_eq!(reg.allocate_and_insert(b), TaskHandle(2));
        assert_eq!(reg.handles(), vec![TaskHandle(1), TaskHandle(2)]);
    }

    #[test]
    fn test_take_removes_and_never_reuses() {
        let reg = Registry::new();
        let (a, _ta) = record("a");
        let h = reg.allocate_and_insert(a);
        assert!(reg.take(h).is_some());
        assert!(reg.take(h).is_none());
        assert!(!reg.contains(h));

        let (b, _tb) = record("b");
        assert_ne!(reg.allocate_and_insert(b), h);
    }

    #[test]
    fn test_lookup_shares_cancel_controller() {
        let reg = Registry::new();
        let (a, _ta) = record("a");
        let token = a.cancel.clone();
        let h = reg.allocate_and_insert(a);

        let found = reg.lookup(h).unwrap();
        found.cancel();
        assert!(token.is_cancelled());
        assert!(reg.lookup(TaskHandle(99)).is_none());
    }

    #[test]
    fn test_concurrent_inserts_are_unique() {
        let reg = Arc::new(Registry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    let mut senders = Vec::new();
                    let mut handles = Vec::new();
                    for _ in 0..100 {
                        let (rec, tx) = record("t");
                        senders.push(tx);
                        handles.push(reg.allocate_and_insert(rec));
                    }
                    handles
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for h in t.join().unwrap() {
                assert!(seen.insert(h), "duplicate handle {h}");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(reg.len(), 800);
    }

    #[test]
    fn test_drain_empties_in_handle_order() {
        let reg = Registry::new();
        let mut keep = Vec::new();
        for name in ["a", "b", "c"] {
            let (rec, tx) = record(name);
            keep.push(tx);
            reg.allocate_and_insert(rec);
        }
        let drained: Vec<u64> = reg.drain().into_iter().map(|(h, _)| h.as_raw()).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert_eq!(reg.len(), 0);
    }
}
