//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`], the settings applied to every worker thread the
//! supervisor starts.
//!
//! ## Sentinel values
//! - `stack_size = 0` → platform default stack size

/// Global configuration for the supervisor.
///
/// ## Field semantics
/// - `thread_name`: prefix for worker thread names (`"<prefix>-<handle>"`)
/// - `stack_size`: worker thread stack size in bytes (`0` = platform default)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Prefix for worker thread names.
    pub thread_name: String,

    /// Stack size for worker threads in bytes.
    ///
    /// - `0` = use the platform default
    /// - `n > 0` = passed to `std::thread::Builder::stack_size`
    pub stack_size: usize,
}

impl SupervisorConfig {
    /// Returns the worker stack size as an `Option`.
    ///
    /// - `None` → platform default
    /// - `Some(n)` → explicit size
    #[inline]
    pub fn stack_size(&self) -> Option<usize> {
        if self.stack_size == 0 {
            None
        } else {
            Some(self.stack_size)
        }
    }

    /// Returns the thread name used for the worker of `handle`.
    #[inline]
    pub fn thread_name_for(&self, handle: super::TaskHandle) -> String {
        format!("{}-{}", self.thread_name, handle)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `thread_name = "gatevisor"`
    /// - `stack_size = 0` (platform default)
    fn default() -> Self {
        Self {
            thread_name: "gatevisor".to_string(),
            stack_size: 0,
        }
    }
}
