use std::sync::Arc;

use crate::{
    bridge::{Registry, Route},
    core::SupervisorConfig,
    error::BridgeError,
    platforms::{Bridged, WorkKind},
    subscribers::Subscribe,
};

use super::supervisor::Supervisor;

/// Builder for constructing a [`Supervisor`] with optional features.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    registry: Option<Registry>,
    expose: WorkKind,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            registry: None,
            expose: WorkKind::Operation,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive supervisor events through dedicated workers with bounded
    /// queues, from the moment the supervisor starts.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Uses `registry` instead of [`Registry::global`] for every conversion.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Exposes the supervisor as a handle of type `T` (default: [`Operation`](crate::Operation)).
    pub fn expose<T: Bridged>(mut self) -> Self {
        self.expose = T::KIND;
        self
    }

    /// Builds the supervisor in the `Pending` phase.
    ///
    /// Fails if the registry cannot convert the canonical handle to the exposed kind.
    pub fn build(self) -> Result<Supervisor, BridgeError> {
        let registry = self.registry.unwrap_or_else(|| Registry::global().clone());

        let route = Route::new(WorkKind::Operation, self.expose);
        if !registry.has_route(route) {
            return Err(BridgeError::NoConverterAvailable {
                from: route.from,
                to: route.to,
            });
        }

        Ok(Supervisor::new_internal(
            self.cfg,
            registry,
            self.subscribers,
            self.expose,
        ))
    }
}
