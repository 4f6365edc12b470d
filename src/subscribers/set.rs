//! # SubscriberSet: fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscriber in
//! registration order.
//!
//! ## What it guarantees
//! - Per-publisher FIFO for every subscriber.
//! - Panics inside subscribers are caught (isolation); the remaining subscribers
//!   receive the event and a `SubscriberPanicked` event.
//!
//! ## What it does **not** guarantee
//! - No global ordering across publisher threads (use `Event::seq`).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        ├──► S1.on_event()   (catch_unwind)
//!        ├──► S2.on_event()   (catch_unwind)
//!        └──► SN.on_event()   (catch_unwind)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::error;

use crate::error::panic_message;
use crate::events::Event;

use super::Subscribe;

/// Composite fan-out with per-subscriber panic isolation.
#[derive(Default)]
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscribe>>,
}

impl SubscriberSet {
    /// Creates a new set from the given subscribers.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs }
    }

    /// Fan-out one event to all subscribers.
    ///
    /// If a subscriber panics, the panic is reported to every *other* subscriber as
    /// [`EventKind::SubscriberPanicked`](crate::EventKind::SubscriberPanicked).
    /// Panics while handling a `SubscriberPanicked` event are only logged.
    pub fn emit(&self, event: &Event) {
        for (idx, sub) in self.subs.iter().enumerate() {
            let res = catch_unwind(AssertUnwindSafe(|| sub.on_event(event)));
            if let Err(payload) = res {
                let info = panic_message(payload.as_ref());
                error!(subscriber = sub.name(), info = %info, "subscriber panicked");
                if !event.is_subscriber_panic() {
                    self.emit_except(idx, &Event::subscriber_panicked(sub.name(), info));
                }
            }
        }
    }

    fn emit_except(&self, skip: usize, event: &Event) {
        for (idx, sub) in self.subs.iter().enumerate() {
            if idx == skip {
                continue;
            }
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                error!(
                    subscriber = sub.name(),
                    info = %panic_message(payload.as_ref()),
                    "subscriber panicked while handling a panic report"
                );
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}
