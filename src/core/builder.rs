use std::sync::Arc;

use crate::{
    core::SupervisorConfig,
    subscribers::{Subscribe, SubscriberSet},
};
use super::supervisor::Supervisor;

/// Builder for constructing a Supervisor.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events (spawn, stop, failure, join) inline on
    /// the publishing thread.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// The returned supervisor owns an empty registry; its first handle is `1`.
    pub fn build(self) -> Arc<Supervisor> {
        let subs = Arc::new(SubscriberSet::new(self.subscribers));
        Arc::new(Supervisor::new_internal(self.cfg, subs))
    }
}
