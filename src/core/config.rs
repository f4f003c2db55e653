//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`], the per-supervisor settings consumed by
//! [`SupervisorBuilder`](crate::SupervisorBuilder).

/// Settings for one supervisor.
///
/// ## Field semantics
/// - `name`: label attached to every event this supervisor publishes
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped)
/// - `prune_concluded`: forget workers that conclude on their own
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Supervisor name, used in events and logs.
    pub name: String,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Remove workers from the active set when they conclude without a release.
    ///
    /// When disabled, self-concluded workers stay tracked until released or until
    /// the supervisor concludes.
    pub prune_concluded: bool,
}

impl SupervisorConfig {
    /// Default configuration under another name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// - `name = "supervisor"`
    /// - `bus_capacity = 1024`
    /// - `prune_concluded = true`
    fn default() -> Self {
        Self {
            name: "supervisor".to_string(),
            bus_capacity: 1024,
            prune_concluded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.name, "supervisor");
        assert_eq!(cfg.bus_capacity, 1024);
        assert!(cfg.prune_concluded);
    }

    #[test]
    fn capacity_is_clamped() {
        let cfg = SupervisorConfig {
            bus_capacity: 0,
            ..SupervisorConfig::named("edge")
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.name, "edge");
    }
}
