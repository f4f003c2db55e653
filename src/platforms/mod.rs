//! # Concurrency runtimes and their bridges.
//!
//! Every supported runtime is a [`Platform`]: it knows how to turn a canonical
//! [`Operation`] into its own primitive (forward) and how to mirror its primitive as an
//! operation (backward). The hub, [`OperationPlatform`], is the identity.
//!
//! ```text
//!             forward                      backward
//! Operation ───────────► Task   Task ───────────────► Operation
//! Operation ───────────► Future Future ─────────────► Operation
//! ```
//!
//! Foreign-to-foreign conversion is not offered; callers hop through the hub.
//!
//! | Kind        | Handle           | Runtime                          |
//! |-------------|------------------|----------------------------------|
//! | `operation` | [`Operation`]    | none                             |
//! | `task`      | [`TaskHandle`]   | ambient tokio runtime            |
//! | `future`    | [`FutureHandle`] | `futures` thread pool (`futures-pool`) |

mod drive;
#[cfg(feature = "futures-pool")]
mod future;
mod task;
mod work;

use std::fmt;
use std::sync::Arc;

use crate::bridge::{Converter, Route};
use crate::error::BridgeError;
use crate::operation::Operation;

#[cfg(feature = "futures-pool")]
pub use future::{FutureHandle, FuturePlatform};
pub use task::{Joined, TaskHandle, TaskPlatform};
pub use work::{Bridged, Handle, Work, WorkId, Worker};

/// Closed set of runtime kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkKind {
    /// Canonical [`Operation`].
    Operation,
    /// Tokio task.
    Task,
    /// Future on a `futures` thread pool.
    #[cfg(feature = "futures-pool")]
    Future,
}

impl WorkKind {
    /// Returns a short stable label for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkKind::Operation => "operation",
            WorkKind::Task => "task",
            #[cfg(feature = "futures-pool")]
            WorkKind::Future => "future",
        }
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A concurrency runtime that can be bridged to [`Operation`].
///
/// Implementors provide the two directions; [`Platform::routes`] turns them into the
/// converters a [`Registry`](crate::Registry) indexes.
pub trait Platform: Send + Sync + 'static {
    /// Kind handled by this platform.
    fn kind(&self) -> WorkKind;

    /// Runs `operation` inside this runtime's primitive.
    ///
    /// A pending operation is started. Cancelling the primitive aborts the operation;
    /// concluding the operation resolves the primitive.
    fn forward(&self, operation: Operation) -> Result<Work, BridgeError>;

    /// Mirrors an active primitive of this runtime with a running operation.
    ///
    /// Aborting the operation cancels the primitive; the primitive's outcome
    /// concludes the operation.
    fn backward(&self, work: Work) -> Result<Operation, BridgeError>;

    /// Same-kind conversion; the identity unless overridden.
    fn passthrough(&self, work: Work) -> Result<Work, BridgeError> {
        Ok(work)
    }

    /// Converters this platform contributes.
    fn routes(self: Arc<Self>) -> Vec<(Route, Converter)> {
        let kind = self.kind();
        let forward = Arc::clone(&self);
        let backward = Arc::clone(&self);
        vec![
            (
                Route::new(WorkKind::Operation, kind),
                Arc::new(move |work: Work| forward.forward(Operation::from_work(work)?)) as Converter,
            ),
            (
                Route::new(kind, WorkKind::Operation),
                Arc::new(move |work: Work| backward.backward(work).map(Work::from)) as Converter,
            ),
            (
                Route::new(kind, kind),
                Arc::new(move |work: Work| self.passthrough(work)) as Converter,
            ),
        ]
    }
}

/// The hub: operations convert to themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperationPlatform;

impl Platform for OperationPlatform {
    fn kind(&self) -> WorkKind {
        WorkKind::Operation
    }

    fn forward(&self, operation: Operation) -> Result<Work, BridgeError> {
        Ok(operation.into())
    }

    fn backward(&self, work: Work) -> Result<Operation, BridgeError> {
        Operation::from_work(work)
    }

    fn routes(self: Arc<Self>) -> Vec<(Route, Converter)> {
        vec![(
            Route::new(WorkKind::Operation, WorkKind::Operation),
            Arc::new(move |work: Work| self.passthrough(work)) as Converter,
        )]
    }
}

/// Foreign platforms usable in this process.
///
/// The tokio bridge is always listed; it checks for an ambient runtime per conversion.
/// The thread-pool bridge is listed only if a pool can be created.
pub fn available() -> Vec<Arc<dyn Platform>> {
    let mut platforms: Vec<Arc<dyn Platform>> = vec![Arc::new(TaskPlatform)];
    #[cfg(feature = "futures-pool")]
    if let Some(platform) = FuturePlatform::detect() {
        platforms.push(Arc::new(platform));
    }
    platforms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_lowercase() {
        assert_eq!(WorkKind::Operation.to_string(), "operation");
        assert_eq!(WorkKind::Task.as_label(), "task");
    }

    #[test]
    fn foreign_platforms_contribute_three_routes() {
        let routes = Arc::new(TaskPlatform).routes();
        let mut pairs: Vec<_> = routes.iter().map(|(route, _)| *route).collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                Route::new(WorkKind::Operation, WorkKind::Task),
                Route::new(WorkKind::Task, WorkKind::Operation),
                Route::new(WorkKind::Task, WorkKind::Task),
            ]
        );
    }

    #[test]
    fn hub_contributes_only_identity() {
        let routes = Arc::new(OperationPlatform).routes();
        assert_eq!(routes.len(), 1);
        let op = Operation::new();
        let work = Work::from(op.clone());
        let id = work.id();
        let out = (routes[0].1)(work).unwrap();
        assert_eq!(out.id(), id);
        assert!(Operation::from_work(out).unwrap().ptr_eq(&op));
    }

    #[test]
    fn task_platform_always_listed() {
        assert!(available().iter().any(|p| p.kind() == WorkKind::Task));
    }
}
