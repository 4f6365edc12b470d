//! # LogWriter: structured event logger
//!
//! A subscriber that forwards incoming [`Event`]s to [`tracing`]. The library never
//! installs a global tracing subscriber; the host decides where these records go.
//!
//! ## Example output (with `tracing_subscriber::fmt`)
//! ```text
//! INFO gatevisor: task spawned handle=1 task="gateway"
//! INFO gatevisor: stop requested handle=1
//! INFO gatevisor: task stopped handle=1 task="gateway"
//! INFO gatevisor: task joined handle=1
//! WARN gatevisor: task failed handle=2 task="gateway" error="execution failed: connection refused"
//! WARN gatevisor: unknown handle handle=99
//! ```

use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let handle = e.handle.map(|h| h.as_raw());
        let task = e.task.as_deref();
        let err = e.error.as_deref();

        match e.kind {
            EventKind::TaskSpawned => info!(seq = e.seq, handle, task, "task spawned"),
            EventKind::TaskStopRequested => info!(seq = e.seq, handle, "stop requested"),
            EventKind::TaskStopped => info!(seq = e.seq, handle, task, "task stopped"),
            EventKind::TaskFailed => warn!(seq = e.seq, handle, task, error = err, "task failed"),
            EventKind::TaskJoined => info!(seq = e.seq, handle, error = err, "task joined"),
            EventKind::UnknownHandle => warn!(seq = e.seq, handle, "unknown handle"),
            EventKind::SubscriberPanicked => {
                error!(seq = e.seq, subscriber = task, info = err, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
