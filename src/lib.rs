//! # gatevisor
//!
//! **Gatevisor** lets a foreign host (a process embedding this crate as a native
//! library) start a long-running, cancellable gateway in the background, get an
//! opaque handle back immediately, and later block until that gateway has been
//! asked to stop and has actually stopped.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   foreign caller
//!        │ spawn_gateway(listen, network, endpoint, assets)      wait_for_gateway(handle)
//!        ▼                                                                 │
//! ┌──────────────────────┐                                                 │
//! │ ffi::adapter         │ copy foreign strings → GatewayConfig            │
//! └──────────┬───────────┘                                                 │
//!            ▼                                                             ▼
//! ┌───────────────────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                                   │
//! │  - Registry (handle → TaskRecord { CancellationToken, oneshot::Receiver })    │
//! │  - SubscriberSet (lifecycle events → LogWriter → tracing)                     │
//! │  spawn: allocate_and_insert ─► launch worker ─► return handle                 │
//! │  join:  take(handle) ─► cancel() ─► blocking_recv() ─► Ok / Err               │
//! └──────────┬────────────────────────────────────────────────────────────────────┘
//!            ▼ one OS thread per task
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Worker #1    │   │ Worker #2    │   │ Worker #N    │
//!     │ current-     │   │ current-     │   │ current-     │
//!     │ thread rt    │   │ thread rt    │   │ thread rt    │
//!     │ Gateway::run │   │ Gateway::run │   │ Task::run    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └── exactly one outcome per task via oneshot::Sender ──┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Running ──(cancel signal sent)──► Stopping ──(task returns)──► Completed{Ok|Err}
//! ```
//! Cancellation is cooperative and idempotent. There is no watchdog: a task that
//! never observes its token keeps its joiner blocked.
//!
//! ## Features
//! | Area              | Description                                                   | Key types                               |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------|
//! | **Supervision**   | Spawn, cancel, join and shut down background tasks by handle. | [`Supervisor`], [`TaskHandle`]          |
//! | **Tasks**         | Async cancelable units; closures or custom types.             | [`Task`], [`TaskFn`], [`TaskRef`]       |
//! | **Gateway**       | The supervised collaborator: asset server + backend proxy.    | [`Gateway`], [`GatewayConfig`]          |
//! | **Boundary**      | C ABI entry points and the foreign string adapter.            | [`ffi`]                                 |
//! | **Subscriber API**| Hook into lifecycle events.                                   | [`Subscribe`], [`LogWriter`]            |
//! | **Errors**        | Typed errors keeping unknown handles apart from failures.     | [`RuntimeError`], [`TaskError`]         |
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use gatevisor::{Supervisor, SupervisorConfig, TaskError, TaskFn, TaskRef};
//!
//! let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!
//! let ticker: TaskRef = TaskFn::arc("ticker", |ctx: CancellationToken| async move {
//!     while !ctx.is_cancelled() {
//!         tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     }
//!     Ok::<_, TaskError>(())
//! });
//!
//! let handle = sup.spawn(ticker)?;
//! sup.join(handle)?;
//! # Ok::<(), gatevisor::RuntimeError>(())
//! ```
mod core;
mod error;
mod events;
mod gateway;
mod subscribers;
mod tasks;

pub mod ffi;

// ---- Public re-exports ----

pub use crate::core::{Supervisor, SupervisorBuilder, SupervisorConfig, TaskHandle};
pub use error::{ConfigError, RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use gateway::{Endpoint, Gateway, GatewayConfig, Network};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Task, TaskFn, TaskRef};
