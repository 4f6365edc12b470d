//! # Supervisor: spawns cancellable background tasks and joins them by handle.
//!
//! The [`Supervisor`] owns the task [`Registry`], a [`SubscriberSet`], and the root
//! cancellation token every task token is derived from.
//!
//! ## Key responsibilities
//! - `spawn`: allocate a handle, register the record, start the worker thread
//! - `join`: remove the record, signal cancellation, block until the outcome arrives
//! - `cancel`: signal cancellation without waiting
//! - `shutdown`: cancel every live task, then join all of them
//!
//! ## Per-task state machine
//! ```text
//! Running ──(cancel signal sent)──► Stopping ──(task returns)──► Completed{Ok|Err}
//! ```
//! `join` only sends the signal; completion is driven by the task itself. There is
//! no watchdog: if a task never observes its token, its joiner blocks forever.
//!
//! ## Spawn ordering
//! ```text
//! spawn(task):
//!   token = root.child_token()
//!   (tx, rx) = oneshot::channel()
//!   handle = registry.allocate_and_insert(TaskRecord { token, rx })   ◄── visible from here
//!   publish(TaskSpawned)
//!   Worker { task, token, tx }.launch()                                   (thread starts)
//!   return handle
//! ```
//! The record is in the registry before the worker exists, so a `join` on a
//! just-returned handle always finds it. `TaskSpawned` goes out before the worker
//! can publish anything for the same handle.
//!
//! ## Repeated joins
//! `join` removes the record before waiting. A second `join` on the same handle,
//! concurrent or later, reports [`RuntimeError::UnknownHandle`].
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use gatevisor::{Supervisor, SupervisorConfig, TaskFn, TaskError};
//!
//! let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!
//! let handle = sup
//!     .spawn(TaskFn::arc("idle", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, TaskError>(())
//!     }))
//!     .unwrap();
//!
//! assert!(sup.join(handle).is_ok());
//! assert!(sup.join(handle).unwrap_err().is_unknown_handle());
//! ```

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::core::registry::{Registry, TaskHandle, TaskRecord};
use crate::core::worker::Worker;
use crate::error::{RuntimeError, TaskError};
use crate::events::{Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::tasks::TaskRef;

/// Spawns tasks onto worker threads and joins them by handle.
pub struct Supervisor {
    cfg: SupervisorConfig,
    registry: Registry,
    subs: Arc<SubscriberSet>,
    root: CancellationToken,
}

impl Supervisor {
    /// Creates a builder for a supervisor with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: SupervisorConfig, subs: Arc<SubscriberSet>) -> Self {
        Self {
            cfg,
            registry: Registry::new(),
            subs,
            root: CancellationToken::new(),
        }
    }

    /// Starts `task` on its own worker thread and returns its handle.
    ///
    /// Returns as soon as the worker thread is launched; never waits for the task.
    ///
    /// # Errors
    /// [`RuntimeError::Spawn`] if the OS refuses to start a thread. The record is
    /// removed again, so the failed handle is never observable.
    pub fn spawn(&self, task: TaskRef) -> Result<TaskHandle, RuntimeError> {
        let token = self.root.child_token();
        let (tx, rx) = oneshot::channel();
        let name: Arc<str> = Arc::from(task.name());

        let handle = self.registry.allocate_and_insert(TaskRecord {
            name: Arc::clone(&name),
            cancel: token.clone(),
            outcome: rx,
        });

        let worker = Worker {
            handle,
            task,
            token,
            outcome: tx,
            subs: Arc::clone(&self.subs),
        };

        self.publish(
            Event::new(EventKind::TaskSpawned)
                .with_handle(handle)
                .with_task(Arc::clone(&name)),
        );

        if let Err(source) = worker.launch(&self.cfg) {
            self.registry.take(handle);
            self.publish(
                Event::new(EventKind::TaskFailed)
                    .with_handle(handle)
                    .with_task(name)
                    .with_error(format!("worker thread not started: {source}")),
            );
            return Err(RuntimeError::Spawn { source });
        }
        Ok(handle)
    }

    /// Signals cancellation to `handle` and blocks until its outcome is delivered.
    ///
    /// Cancellation (`Ok(())` or `TaskError::Canceled` from the task) is success.
    /// The record is removed from the registry before waiting.
    ///
    /// # Errors
    /// - [`RuntimeError::UnknownHandle`] if `handle` is not live (never spawned, or
    ///   already joined);
    /// - [`RuntimeError::TaskFailed`] if the task reported an error.
    ///
    /// - [`RuntimeError::InAsyncContext`] if called from a thread inside an async
    ///   runtime; the wait is a blocking receive, so the task is left untouched.
    pub fn join(&self, handle: TaskHandle) -> Result<(), RuntimeError> {
        ensure_blocking_allowed()?;

        let Some(record) = self.registry.take(handle) else {
            self.publish(Event::new(EventKind::UnknownHandle).with_handle(handle));
            return Err(RuntimeError::UnknownHandle { handle });
        };

        self.signal_stop(handle, &record.cancel);
        self.await_outcome(handle, record)
    }

    /// Signals cancellation to `handle` without waiting for it to stop.
    ///
    /// Idempotent: cancelling an already-cancelled task has no further effect.
    /// The task stays in the registry until joined.
    ///
    /// # Errors
    /// [`RuntimeError::UnknownHandle`] if `handle` is not live.
    pub fn cancel(&self, handle: TaskHandle) -> Result<(), RuntimeError> {
        match self.registry.lookup(handle) {
            Some(token) => {
                self.signal_stop(handle, &token);
                Ok(())
            }
            None => {
                self.publish(Event::new(EventKind::UnknownHandle).with_handle(handle));
                Err(RuntimeError::UnknownHandle { handle })
            }
        }
    }

    /// Cancels every live task, then waits for all of them.
    ///
    /// Returns each drained handle with its outcome, ordered by handle. Tasks that
    /// another thread is already joining are not included.
    ///
    /// # Errors
    /// [`RuntimeError::InAsyncContext`] under the same condition as
    /// [`Supervisor::join`]; nothing is drained or cancelled in that case.
    pub fn shutdown(&self) -> Result<Vec<(TaskHandle, Result<(), RuntimeError>)>, RuntimeError> {
        ensure_blocking_allowed()?;

        let records = self.registry.drain();
        for (handle, record) in &records {
            self.signal_stop(*handle, &record.cancel);
        }

        Ok(records
            .into_iter()
            .map(|(handle, record)| (handle, self.await_outcome(handle, record)))
            .collect())
    }

    /// Returns sorted list of live handles.
    pub fn handles(&self) -> Vec<TaskHandle> {
        self.registry.handles()
    }

    /// True if `handle` is live (spawned and not yet joined).
    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.registry.contains(handle)
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if no task is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Blocks until the worker writes its outcome, then reports the join.
    fn await_outcome(&self, handle: TaskHandle, record: TaskRecord) -> Result<(), RuntimeError> {
        let outcome = record.outcome.blocking_recv().unwrap_or(Err(TaskError::Lost));

        let mut ev = Event::new(EventKind::TaskJoined)
            .with_handle(handle)
            .with_task(record.name);
        if let Err(e) = &outcome {
            ev = ev.with_error(e.to_string());
        }
        self.publish(ev);

        outcome.map_err(|source| RuntimeError::TaskFailed { handle, source })
    }

    fn signal_stop(&self, handle: TaskHandle, token: &CancellationToken) {
        token.cancel();
        self.publish(Event::new(EventKind::TaskStopRequested).with_handle(handle));
    }

    fn publish(&self, ev: Event) {
        self.subs.emit(&ev);
    }
}

impl Drop for Supervisor {
    /// Cancels every task still running; worker threads finish on their own.
    fn drop(&mut self) {
        self.root.cancel();
    }
}

/// Refuses to block a thread that is driving an async runtime.
fn ensure_blocking_allowed() -> Result<(), RuntimeError> {
    match tokio::runtime::Handle::try_current() {
        Ok(_) => Err(RuntimeError::InAsyncContext),
        Err(_) => Ok(()),
    }
}
