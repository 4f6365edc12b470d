//! Runtime core: spawning, registry, and joining.
//!
//! The public API from this module is [`Supervisor`] (built via
//! [`SupervisorBuilder`]), its [`SupervisorConfig`], and the opaque [`TaskHandle`].
//!
//! Internal modules:
//! - [`registry`]: handle allocation and the handle → record mapping;
//! - [`worker`]: runs one task on a dedicated thread and delivers its outcome;
//! - [`supervisor`]: spawn / join / cancel / shutdown;
//! - [`builder`]: assembles a supervisor with its subscribers;
//! - [`config`]: worker thread settings.

mod builder;
mod config;
mod registry;
mod supervisor;
mod worker;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use registry::TaskHandle;
pub use supervisor::Supervisor;
