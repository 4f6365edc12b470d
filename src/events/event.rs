//! # Runtime events emitted by the supervisor and task workers.
//!
//! The [`EventKind`] enum classifies event types across two categories:
//! - **Lifecycle events**: spawn, stop request, terminal outcome, join
//! - **Boundary events**: unknown handles, subscriber failures
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the task
//! handle and name, and error text.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events from different threads reach subscribers in publish order per thread only;
//! use `seq` to restore the global order.
//!
//! ## Example
//! ```rust
//! use gatevisor::{Event, EventKind, TaskHandle};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_handle(TaskHandle::from_raw(4))
//!     .with_task("gateway")
//!     .with_error("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.handle, Some(TaskHandle::from_raw(4)));
//! assert_eq!(ev.error.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::TaskHandle;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `error`: panic info/message
    SubscriberPanicked,

    // === Task lifecycle events ===
    /// Task was registered and its worker thread started.
    ///
    /// Sets:
    /// - `handle`: assigned handle
    /// - `task`: task name
    TaskSpawned,

    /// Cancellation was signalled for a task (by `cancel`, `join` or `shutdown`).
    ///
    /// Sets:
    /// - `handle`: task handle
    TaskStopRequested,

    /// Task returned cleanly (`Ok` or `Canceled`).
    ///
    /// Sets:
    /// - `handle`: task handle
    /// - `task`: task name
    TaskStopped,

    /// Task returned an error or panicked.
    ///
    /// Sets:
    /// - `handle`: task handle
    /// - `task`: task name
    /// - `error`: failure message
    TaskFailed,

    /// A joiner received the task's outcome; the record is gone from the registry.
    ///
    /// Sets:
    /// - `handle`: task handle
    /// - `error`: failure message, if the outcome was an error
    TaskJoined,

    // === Boundary events ===
    /// A caller used a handle the registry does not know.
    ///
    /// Sets:
    /// - `handle`: the handle passed in
    UnknownHandle,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Handle of the task, if applicable.
    pub handle: Option<TaskHandle>,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable error text.
    pub error: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            handle: None,
            task: None,
            error: None,
        }
    }

    /// Attaches a task handle.
    #[inline]
    pub fn with_handle(mut self, handle: TaskHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches error text.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_error(info)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskSpawned);
        let b = Event::new(EventKind::TaskStopped);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_subscriber_panicked_sets_fields() {
        let ev = Event::subscriber_panicked("audit", "boom".to_string());
        assert!(ev.is_subscriber_panic());
        assert_eq!(ev.task.as_deref(), Some("audit"));
        assert_eq!(ev.error.as_deref(), Some("boom"));
        assert!(ev.handle.is_none());
    }
}
