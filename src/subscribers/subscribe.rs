//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into the
//! runtime. Handlers run inline on the thread that published the event.
//!
//! ## Contract
//! - Implementations must not block: the publisher may be a caller inside `spawn`,
//!   a joiner, or a worker thread reporting its outcome.
//! - A panicking subscriber is isolated by the [`SubscriberSet`](crate::SubscriberSet);
//!   other subscribers still receive the event.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use gatevisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! impl Subscribe for FailureCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskFailed {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use crate::events::Event;

/// Contract for event subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
