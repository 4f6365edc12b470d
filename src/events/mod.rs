//! Runtime events published by the supervisor and its workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor::spawn` / `join` / `cancel` (caller threads) and
//!   the per-task worker threads.
//! - **Consumers**: the [`SubscriberSet`](crate::SubscriberSet) owned by the supervisor.

mod event;

pub use event::{Event, EventKind};
