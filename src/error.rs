//! Error types used by the gatevisor runtime, its tasks, and the foreign boundary.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself (spawn/join).
//! - [`TaskError`]: outcomes reported by a background task (the gateway).
//! - [`ConfigError`]: failures while copying foreign strings into owned config.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging.

use std::any::Any;

use thiserror::Error;

use crate::core::TaskHandle;

/// # Errors produced by the gatevisor supervisor.
///
/// An unknown handle and a task that ran and failed are distinct
/// variants, even though the boolean boundary collapses both to `false`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The handle was never returned by `spawn`, or it has already been joined.
    #[error("no such task: {handle}")]
    UnknownHandle {
        /// The handle the caller passed in.
        handle: TaskHandle,
    },

    /// The task ran and reported an error.
    #[error("task {handle} failed: {source}")]
    TaskFailed {
        /// The handle of the failed task.
        handle: TaskHandle,
        /// The error delivered through the task's outcome channel.
        #[source]
        source: TaskError,
    },

    /// A blocking wait was requested from a thread driving an async runtime.
    /// The task and its handle are left untouched.
    #[error("cannot block on a task from inside an async runtime")]
    InAsyncContext,

    /// The dedicated worker thread could not be started.
    #[error("failed to spawn worker thread: {source}")]
    Spawn {
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gatevisor::{RuntimeError, TaskHandle};
    ///
    /// let err = RuntimeError::UnknownHandle { handle: TaskHandle::from_raw(7) };
    /// assert_eq!(err.as_label(), "runtime_unknown_handle");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::UnknownHandle { .. } => "runtime_unknown_handle",
            RuntimeError::TaskFailed { .. } => "runtime_task_failed",
            RuntimeError::InAsyncContext => "runtime_in_async_context",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::UnknownHandle { handle } => format!("unknown handle {handle}"),
            RuntimeError::TaskFailed { handle, source } => {
                format!("task {handle}: {}", source.as_message())
            }
            RuntimeError::InAsyncContext => "blocking wait inside async runtime".to_string(),
            RuntimeError::Spawn { source } => format!("spawn: {source}"),
        }
    }

    /// True if the caller passed a handle the registry does not know.
    pub fn is_unknown_handle(&self) -> bool {
        matches!(self, RuntimeError::UnknownHandle { .. })
    }
}

/// # Outcomes reported by a background task.
///
/// `Canceled` is a clean stop: the joiner treats it exactly like `Ok(())`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task failed while running (e.g. the backend was unreachable).
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The task could not run at all with the given configuration.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The task panicked; the panic was caught on its worker thread.
    #[error("task panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The task observed cancellation and stopped.
    #[error("context cancelled")]
    Canceled,

    /// The worker dropped its outcome slot without writing to it.
    #[error("task outcome lost")]
    Lost,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gatevisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "connection refused".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Canceled => "task_canceled",
            TaskError::Lost => "task_lost",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::Canceled => "context cancelled".to_string(),
            TaskError::Lost => "outcome lost".to_string(),
        }
    }

    /// Indicates whether this outcome counts as a clean stop.
    ///
    /// # Example
    /// ```
    /// use gatevisor::TaskError;
    ///
    /// assert!(TaskError::Canceled.is_clean_stop());
    /// assert!(!TaskError::Fatal { error: "nope".into() }.is_clean_stop());
    /// ```
    pub fn is_clean_stop(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// # Errors raised while marshalling foreign strings.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required string pointer was null.
    #[error("{field} is null")]
    NullPointer {
        /// Name of the offending argument.
        field: &'static str,
    },

    /// A string was not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    NotUtf8 {
        /// Name of the offending argument.
        field: &'static str,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NullPointer { .. } => "config_null_pointer",
            ConfigError::NotUtf8 { .. } => "config_not_utf8",
        }
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
