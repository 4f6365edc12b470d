//! # Event subscribers for the gatevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   spawn/join/cancel (caller thread) ──┐
//!   worker thread (task outcome)      ──┴─► Supervisor::publish(Event)
//!                                               │
//!                                               ▼
//!                                         SubscriberSet::emit(&Event)
//!                                          ┌────┴────┬─────────┐
//!                                          ▼         ▼         ▼
//!                                      LogWriter   Custom     ...
//! ```
//!
//! Publishers are foreign threads that may have no async runtime, so delivery is
//! synchronous on the publishing thread. Subscribers must be quick.

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
