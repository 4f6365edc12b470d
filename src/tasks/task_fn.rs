//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancellationToken) -> Fut`, producing a fresh
//! future per run. Shared state, if any, must be captured explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use gatevisor::{TaskFn, TaskRef, TaskError};
//!
//! let t: TaskRef = TaskFn::arc("worker", |ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::task::Task;

/// Function-backed task implementation.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`](crate::TaskRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_run_gets_fresh_future() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let task = TaskFn::arc("counter", move |_ctx: CancellationToken| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        });

        task.run(CancellationToken::new()).await.unwrap();
        task.run(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_observes_token() {
        let task = TaskFn::arc("waiter", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });
        let token = CancellationToken::new();
        token.cancel();
        let res = task.run(token).await;
        assert!(matches!(res, Err(TaskError::Canceled)));
    }
}
