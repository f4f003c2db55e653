//! # Thread-pool future bridge.
//!
//! [`FutureHandle`] is a future spawned on a `futures` [`ThreadPool`], made abortable and
//! panic-safe, with its outcome shared between clones. Listeners registered with
//! [`FutureHandle::add_listener`] run on the same pool once the outcome is known.
//!
//! The outcome travels to the handle over a oneshot channel, so dropping every clone of a
//! [`FutureHandle`] detaches from the future without cancelling it. Only
//! [`FutureHandle::cancel`] stops it.
//!
//! [`FuturePlatform`] mirrors [`TaskPlatform`](crate::TaskPlatform) for this runtime;
//! it carries its own pool, so neither direction needs an ambient executor.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::ThreadPool;
use futures::future::{self, AbortHandle};
use futures::task::SpawnExt;
use tracing::warn;

use crate::error::{BridgeError, WorkError};
use crate::operation::{Conclusion, Operation, Output};
use crate::platforms::drive::{launch, mirror, run_to_conclusion, settle};
use crate::platforms::task::Joined;
use crate::platforms::{Bridged, Handle, Platform, Work, WorkKind};

/// Cloneable handle over a future running on a thread pool.
#[derive(Clone)]
pub struct FutureHandle {
    pool: ThreadPool,
    abort: AbortHandle,
    done: Joined,
}

impl FutureHandle {
    /// Spawns `fut` on `pool`.
    pub fn spawn<F>(pool: &ThreadPool, fut: F) -> Result<Self, BridgeError>
    where
        F: Future<Output = Result<Output, WorkError>> + Send + 'static,
    {
        Self::spawn_conclusion(
            pool,
            fut.map(|result| match result {
                Ok(output) => Conclusion::Completed(output),
                Err(error) => Conclusion::Failed(error),
            }),
        )
    }

    pub(crate) fn spawn_conclusion<F>(pool: &ThreadPool, fut: F) -> Result<Self, BridgeError>
    where
        F: Future<Output = Conclusion> + Send + 'static,
    {
        let (abortable, abort) = future::abortable(AssertUnwindSafe(fut).catch_unwind());
        let (tx, rx) = oneshot::channel();
        pool.spawn(async move {
            let conclusion = match abortable.await {
                Ok(Ok(conclusion)) => conclusion,
                Ok(Err(payload)) => Conclusion::Failed(WorkError::from_panic(&*payload)),
                Err(future::Aborted) => Conclusion::Aborted,
            };
            // Every handle may be gone; the outcome is then unobserved.
            let _ = tx.send(conclusion);
        })
        .map_err(|err| BridgeError::RuntimeUnavailable {
            kind: WorkKind::Future,
            reason: err.to_string(),
        })?;

        Ok(Self {
            pool: pool.clone(),
            abort,
            done: rx
                .map(|received| received.unwrap_or(Conclusion::Aborted))
                .boxed()
                .shared(),
        })
    }

    /// Requests cancellation; the future concludes `Aborted` at its next poll.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// True once [`FutureHandle::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Runs `listener` on the pool once the outcome is known.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(Conclusion) + Send + 'static,
    {
        let done = self.done.clone();
        self.pool.spawn_ok(async move { listener(done.await) });
    }

    /// Outcome, if some observer already awaited it.
    pub fn peek(&self) -> Option<Conclusion> {
        self.done.peek().cloned()
    }

    /// Future resolving with the outcome; cancellation maps to `Aborted`.
    pub fn join(&self) -> Joined {
        self.done.clone()
    }
}

impl fmt::Debug for FutureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureHandle")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Bridged for FutureHandle {
    const KIND: WorkKind = WorkKind::Future;

    fn from_work(work: Work) -> Result<Self, BridgeError> {
        match work.into_handle() {
            Handle::Future(fut) => Ok(fut),
            other => Err(BridgeError::KindMismatch {
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }
}

/// Converts between [`Operation`]s and thread-pool futures.
#[derive(Clone)]
pub struct FuturePlatform {
    pool: ThreadPool,
}

impl FuturePlatform {
    /// Bridges onto `pool`.
    pub fn new(pool: ThreadPool) -> Self {
        Self { pool }
    }

    /// Bridges onto a fresh pool, or `None` if one cannot be created here.
    pub fn detect() -> Option<Self> {
        match ThreadPool::builder().name_prefix("workvisor-pool-").create() {
            Ok(pool) => Some(Self::new(pool)),
            Err(err) => {
                warn!(%err, "thread pool unavailable; future platform disabled");
                None
            }
        }
    }

    /// Pool the platform spawns onto.
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }
}

impl fmt::Debug for FuturePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuturePlatform").finish_non_exhaustive()
    }
}

impl Platform for FuturePlatform {
    fn kind(&self) -> WorkKind {
        WorkKind::Future
    }

    fn forward(&self, operation: Operation) -> Result<Work, BridgeError> {
        let fut = FutureHandle::spawn_conclusion(&self.pool, run_to_conclusion(operation.clone()))?;
        launch(&operation);
        Ok(fut.into())
    }

    fn backward(&self, work: Work) -> Result<Operation, BridgeError> {
        let fut = FutureHandle::from_work(work)?;

        let cancel = fut.clone();
        let op = mirror(move || cancel.cancel());

        let watched = op.clone();
        fut.add_listener(move |conclusion| settle(&watched, conclusion));
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::Phase;
    use crate::testing::eventually;

    fn platform() -> FuturePlatform {
        FuturePlatform::detect().expect("thread pool available in tests")
    }

    #[tokio::test]
    async fn listener_sees_the_outcome() {
        let platform = platform();
        let fut = FutureHandle::spawn(platform.pool(), async { Ok(Output::new(3u16)) }).unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        fut.add_listener(move |conclusion| {
            let _ = tx.send(conclusion);
        });
        let conclusion = rx.await.unwrap();
        assert_eq!(conclusion.output().and_then(|o| o.downcast_ref::<u16>()), Some(&3));
    }

    #[tokio::test]
    async fn panics_conclude_failed() {
        let platform = platform();
        let fut = FutureHandle::spawn(platform.pool(), async {
            if true {
                panic!("pool boom");
            }
            Ok(Output::unit())
        })
        .unwrap();
        let conclusion = fut.join().await;
        assert!(matches!(conclusion.error(), Some(WorkError::Panicked { info }) if info == "pool boom"));
    }

    #[tokio::test]
    async fn forward_cancel_aborts_operation() {
        let op = Operation::new();
        let fut = FutureHandle::from_work(platform().forward(op.clone()).unwrap()).unwrap();
        assert_eq!(op.phase(), Phase::Running);

        fut.cancel();
        let conclusion = tokio::time::timeout(Duration::from_secs(2), op.concluded())
            .await
            .expect("operation concludes");
        assert!(conclusion.is_aborted());
        assert!(fut.join().await.is_aborted());
    }

    #[tokio::test]
    async fn forward_completion_resolves_future() {
        let op = Operation::new();
        let fut = FutureHandle::from_work(platform().forward(op.clone()).unwrap()).unwrap();
        op.complete(Output::new(1i32)).unwrap();
        assert!(fut.join().await.is_completed());
    }

    #[tokio::test]
    async fn dropping_forward_handle_keeps_operation_running() {
        let op = Operation::new();
        drop(platform().forward(op.clone()).unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(op.phase(), Phase::Running);

        op.complete(Output::unit()).unwrap();
        assert!(op.concluded().await.is_completed());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel_spawned_future() {
        let platform = platform();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let fut = FutureHandle::spawn(platform.pool(), async move {
            let _ = rx.await;
            let _ = seen_tx.send(());
            Ok(Output::unit())
        })
        .unwrap();
        drop(fut);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), seen_rx)
            .await
            .expect("future still runs")
            .unwrap();
    }

    #[tokio::test]
    async fn backward_abort_cancels_future() {
        let platform = platform();
        let fut = FutureHandle::spawn(platform.pool(), future::pending()).unwrap();
        let op = platform.backward(fut.clone().into()).unwrap();

        op.abort().unwrap();
        assert!(fut.is_cancelled());
        assert!(fut.join().await.is_aborted());
    }

    #[tokio::test]
    async fn backward_settles_on_foreign_cancel() {
        let platform = platform();
        let fut = FutureHandle::spawn(platform.pool(), future::pending()).unwrap();
        let op = platform.backward(fut.clone().into()).unwrap();

        fut.cancel();
        eventually(|| op.phase() == Phase::Concluded).await;
        assert!(op.try_conclusion().is_some_and(|c| c.is_aborted()));
    }
}
