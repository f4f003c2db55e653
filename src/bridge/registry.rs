//! # Registry: converter lookup by route.
//!
//! The registry is an immutable table `Route { from, to } → Converter`, assembled from
//! [`Platform`]s. With the built-in platforms it forms a star centred on
//! [`WorkKind::Operation`]:
//!
//! ```text
//!            ┌──────────► Task ──┐
//!  Operation ┤                   ├──► Operation
//!     ▲  │   └──────────► Future ┘
//!     └──┘ (passthrough)
//! ```
//!
//! Each foreign kind also converts to itself. Conversions are a single hop.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::bridge::Target;
use crate::error::BridgeError;
use crate::platforms::{self, Bridged, OperationPlatform, Platform, Work, WorkKind};

/// Conversion function for one route.
pub type Converter = Arc<dyn Fn(Work) -> Result<Work, BridgeError> + Send + Sync>;

/// Source and target kind of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route {
    /// Kind of the input envelope.
    pub from: WorkKind,
    /// Kind of the output envelope.
    pub to: WorkKind,
}

impl Route {
    /// Creates a route.
    pub fn new(from: WorkKind, to: WorkKind) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Immutable converter table; cheap to clone.
#[derive(Clone)]
pub struct Registry {
    converters: Arc<HashMap<Route, Converter>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Builder seeded with the hub's passthrough.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Process-wide registry over [`platforms::available`], built on first use.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(|| {
            let registry = Registry::builder().platforms(platforms::available()).build();
            debug!(routes = registry.converters.len(), "global registry ready");
            registry
        })
    }

    /// Converts `work` to kind `to` with the converter for `(work.kind(), to)`.
    pub fn convert(&self, work: Work, to: WorkKind) -> Result<Work, BridgeError> {
        let route = Route::new(work.kind(), to);
        let converter = self.converters.get(&route).ok_or(BridgeError::NoConverterAvailable {
            from: route.from,
            to: route.to,
        })?;
        converter(work)
    }

    /// View fixed to the kind of `T`.
    pub fn target<T: Bridged>(&self) -> Target<T> {
        Target {
            registry: self.clone(),
            _marker: PhantomData,
        }
    }

    /// Registered routes, sorted.
    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.converters.keys().copied().collect();
        routes.sort();
        routes
    }

    /// True if some route starts or ends at `kind`.
    pub fn supports(&self, kind: WorkKind) -> bool {
        self.converters
            .keys()
            .any(|route| route.from == kind || route.to == kind)
    }

    /// True if a converter is registered for `route`.
    pub fn has_route(&self, route: Route) -> bool {
        self.converters.contains_key(&route)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("routes", &self.routes())
            .finish()
    }
}

/// Assembles a [`Registry`] from platforms.
pub struct RegistryBuilder {
    converters: HashMap<Route, Converter>,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
        .platform(OperationPlatform)
    }

    /// Adds every route of `platform`.
    pub fn platform<P: Platform>(self, platform: P) -> Self {
        self.shared(Arc::new(platform))
    }

    /// Adds every route of each platform.
    pub fn platforms<I>(self, platforms: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Platform>>,
    {
        platforms.into_iter().fold(self, Self::shared)
    }

    fn shared(mut self, platform: Arc<dyn Platform>) -> Self {
        for (route, converter) in platform.routes() {
            if self.converters.insert(route, converter).is_some() {
                debug!(%route, "converter replaced");
            }
        }
        self
    }

    /// Freezes the table.
    pub fn build(self) -> Registry {
        Registry {
            converters: Arc::new(self.converters),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::platforms::Handle;
    use crate::{Conclusion, Operation, Output, Phase, TaskHandle, TaskPlatform, available};

    fn foreign_kinds() -> Vec<WorkKind> {
        let mut kinds = vec![WorkKind::Task];
        #[cfg(feature = "futures-pool")]
        kinds.push(WorkKind::Future);
        kinds
    }

    /// Canonical -> foreign -> canonical.
    fn round_trip(registry: &Registry, kind: WorkKind) -> (Operation, Work, Operation) {
        let op = Operation::new();
        let foreign = registry.convert(op.clone().into(), kind).unwrap();
        assert_eq!(foreign.kind(), kind);
        let back = registry.target::<Operation>().convert(foreign.clone()).unwrap();
        (op, foreign, back)
    }

    fn cancel_foreign(work: &Work) {
        match work.handle() {
            Handle::Task(task) => task.abort(),
            #[cfg(feature = "futures-pool")]
            Handle::Future(fut) => fut.cancel(),
            Handle::Operation(_) => panic!("expected a foreign handle"),
        }
    }

    async fn concluded(op: &Operation) -> Conclusion {
        tokio::time::timeout(Duration::from_secs(2), op.concluded())
            .await
            .expect("operation concludes")
    }

    #[test]
    fn builder_starts_with_hub_only() {
        let registry = Registry::builder().build();
        assert_eq!(
            registry.routes(),
            vec![Route::new(WorkKind::Operation, WorkKind::Operation)]
        );
        assert!(!registry.supports(WorkKind::Task));
    }

    #[test]
    fn global_is_a_star_around_operation() {
        let registry = Registry::global();
        assert!(std::ptr::eq(registry, Registry::global()));
        for route in registry.routes() {
            assert!(
                route.from == WorkKind::Operation
                    || route.to == WorkKind::Operation
                    || route.from == route.to,
                "unexpected route {route}"
            );
        }
        assert!(registry.has_route(Route::new(WorkKind::Operation, WorkKind::Task)));
        assert!(registry.has_route(Route::new(WorkKind::Task, WorkKind::Operation)));
    }

    #[cfg(feature = "futures-pool")]
    #[tokio::test]
    async fn foreign_to_foreign_is_not_offered() {
        let task = TaskHandle::spawn(async { Ok(Output::unit()) });
        let err = Registry::global()
            .convert(task.into(), WorkKind::Future)
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::NoConverterAvailable {
                from: WorkKind::Task,
                to: WorkKind::Future,
            }
        );
    }

    #[test]
    fn passthrough_keeps_the_envelope() {
        let work = Work::from(Operation::new());
        let id = work.id();
        let out = Registry::global().convert(work, WorkKind::Operation).unwrap();
        assert_eq!(out.id(), id);
    }

    #[tokio::test]
    async fn missing_platform_is_reported() {
        let registry = Registry::builder().build();
        let err = registry
            .convert(Operation::new().into(), WorkKind::Task)
            .unwrap_err();
        assert_eq!(err.as_label(), "bridge_no_converter");
    }

    #[tokio::test]
    async fn hop_through_the_hub() {
        let registry = Registry::builder().platform(TaskPlatform).build();
        let op = Operation::new();
        let task = registry.target::<TaskHandle>().convert(op.clone().into()).unwrap();
        let back = registry.target::<Operation>().convert(task.clone().into()).unwrap();

        assert_eq!(op.phase(), Phase::Running);
        back.abort().unwrap();
        assert!(task.join().await.is_aborted());
        assert!(op.concluded().await.is_aborted());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn round_trips_carry_completion() {
        let registry = Registry::builder().platforms(available()).build();
        for kind in foreign_kinds() {
            let (op, _foreign, back) = round_trip(&registry, kind);
            assert_eq!(back.phase(), Phase::Running);

            op.complete(Output::new(7u32)).unwrap();
            let conclusion = concluded(&back).await;
            assert_eq!(
                conclusion.output().and_then(|o| o.downcast_ref::<u32>()),
                Some(&7),
                "{kind}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn round_trips_carry_abort_of_the_original() {
        let registry = Registry::builder().platforms(available()).build();
        for kind in foreign_kinds() {
            let (op, _foreign, back) = round_trip(&registry, kind);
            op.abort().unwrap();
            assert!(concluded(&back).await.is_aborted(), "{kind}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn round_trips_carry_abort_of_the_mirror() {
        let registry = Registry::builder().platforms(available()).build();
        for kind in foreign_kinds() {
            let (op, _foreign, back) = round_trip(&registry, kind);
            back.abort().unwrap();
            assert!(concluded(&op).await.is_aborted(), "{kind}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn foreign_cancel_reaches_both_ends() {
        let registry = Registry::builder().platforms(available()).build();
        for kind in foreign_kinds() {
            let (op, foreign, back) = round_trip(&registry, kind);
            cancel_foreign(&foreign);
            assert!(concluded(&op).await.is_aborted(), "{kind}");
            assert!(concluded(&back).await.is_aborted(), "{kind}");
        }
    }
}
