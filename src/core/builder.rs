use std::sync::Arc;

use super::supervisor::Supervisor;
use crate::{
    config::Config,
    events::Bus,
    link::Platform,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: Config,
    platform: Arc<dyn Platform>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and platform.
    pub fn new(cfg: Config, platform: Arc<dyn Platform>) -> Self {
        Self {
            cfg,
            platform,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (link loss, reconnects, recovery, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor.
    ///
    /// Must be called inside a tokio runtime: the event bus listener and the
    /// subscriber workers are spawned here.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        Arc::new(Supervisor::new_internal(self.cfg, self.platform, bus, subs))
    }
}
