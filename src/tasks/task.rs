//! # Background operation abstraction.
//!
//! This module defines the [`Task`] trait (async, cancelable). The supervisor runs
//! every task on its own worker thread and treats it as opaque: it only hands the
//! task a [`CancellationToken`] and collects the single `Result` it returns.
//!
//! A task should observe the token in finite time and return. The supervisor has
//! no watchdog; a task that ignores cancellation keeps its joiner blocked.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// # Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// # Asynchronous, cancelable unit.
///
/// A `Task` has a human-readable [`name`](Task::name) and an async [`run`](Task::run)
/// method that receives a [`CancellationToken`].
///
/// Returning `Ok(())` or `Err(TaskError::Canceled)` is a clean stop; anything else
/// is reported to the joiner as a failure.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use gatevisor::{Task, TaskError};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Task for Idle {
///     fn name(&self) -> &str { "idle" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         ctx.cancelled().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Runs until the token fires or the task fails.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;
}
