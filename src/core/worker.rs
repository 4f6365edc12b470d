//! # Run one task on its own worker thread.
//!
//! Every spawned task gets a dedicated OS thread driving a current-thread tokio
//! runtime. The worker:
//!
//! - **Runs the task once** with the task's [`CancellationToken`]
//! - **Catches panics** so the outcome slot is always written
//! - **Publishes exactly one** terminal event (`TaskStopped` or `TaskFailed`)
//! - **Writes exactly one** outcome into the single-slot channel
//!
//! ## Outcome mapping
//! ```text
//! task.run() → Ok(())             → TaskStopped → send Ok(())
//! task.run() → Err(Canceled)      → TaskStopped → send Ok(())
//! task.run() → Err(Fail/Fatal)    → TaskFailed  → send Err(e)
//! task.run() panics               → TaskFailed  → send Err(Panicked)
//! runtime build fails             → TaskFailed  → send Err(Fatal)
//! ```

use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::core::config::SupervisorConfig;
use crate::core::registry::{OutcomeTx, TaskHandle};
use crate::error::{TaskError, panic_message};
use crate::events::{Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::tasks::TaskRef;

/// Everything a worker thread owns for the lifetime of its task.
pub(crate) struct Worker {
    pub(crate) handle: TaskHandle,
    pub(crate) task: TaskRef,
    pub(crate) token: CancellationToken,
    pub(crate) outcome: OutcomeTx,
    pub(crate) subs: Arc<SubscriberSet>,
}

impl Worker {
    /// Starts the worker thread. The thread is detached; the outcome channel is
    /// the only way to observe its completion.
    pub(crate) fn launch(self, cfg: &SupervisorConfig) -> io::Result<()> {
        let mut builder = thread::Builder::new().name(cfg.thread_name_for(self.handle));
        if let Some(size) = cfg.stack_size() {
            builder = builder.stack_size(size);
        }
        builder.spawn(move || self.run()).map(drop)
    }

    fn run(self) {
        let res = match self.execute() {
            Err(e) if e.is_clean_stop() => Ok(()),
            other => other,
        };

        match &res {
            Ok(()) => self.publish(
                Event::new(EventKind::TaskStopped)
                    .with_handle(self.handle)
                    .with_task(self.task.name()),
            ),
            Err(e) => self.publish(
                Event::new(EventKind::TaskFailed)
                    .with_handle(self.handle)
                    .with_task(self.task.name())
                    .with_error(e.to_string()),
            ),
        }

        // The receiver is gone only if the supervisor was dropped without joining.
        let _ = self.outcome.send(res);
    }

    fn execute(&self) -> Result<(), TaskError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TaskError::Fatal {
                error: format!("failed to build runtime: {e}"),
            })?;

        let fut = AssertUnwindSafe(self.task.run(self.token.clone())).catch_unwind();
        match rt.block_on(fut) {
            Ok(res) => res,
            Err(payload) => Err(TaskError::Panicked {
                info: panic_message(payload.as_ref()),
            }),
        }
    }

    fn publish(&self, ev: Event) {
        self.subs.emit(&ev);
    }
}
