//! # Tokio task bridge.
//!
//! [`TaskHandle`] wraps a spawned tokio task together with a shared view of its outcome,
//! so any number of clones can observe or abort it. [`TaskPlatform`] converts between
//! tasks and [`Operation`]s:
//!
//! ```text
//! forward:  Operation ──start──► spawn(run_to_conclusion(op)) ──► TaskHandle
//!           task aborted  → op aborted
//!           op concluded  → task resolves with the same conclusion
//!
//! backward: TaskHandle ──► mirror (Running) + watcher task
//!           mirror aborted → task aborted
//!           task finished  → mirror settled with the task's conclusion
//! ```
//!
//! Both directions need an ambient tokio runtime; without one they fail with
//! [`BridgeError::RuntimeUnavailable`].

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::runtime;
use tokio::task::{AbortHandle, JoinHandle};

use crate::error::{BridgeError, WorkError};
use crate::operation::{Conclusion, Operation, Output};
use crate::platforms::drive::{launch, mirror, run_to_conclusion, settle};
use crate::platforms::{Bridged, Handle, Platform, Work, WorkKind};

/// Outcome of foreign work, shareable between observers.
pub type Joined = Shared<BoxFuture<'static, Conclusion>>;

/// Cloneable handle over a spawned tokio task.
#[derive(Clone)]
pub struct TaskHandle {
    abort: AbortHandle,
    done: Joined,
}

impl TaskHandle {
    /// Spawns `fut` on the current runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime, like [`tokio::spawn`].
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Output, WorkError>> + Send + 'static,
    {
        Self::from_join(tokio::spawn(fut))
    }

    /// Spawns `fut` on `runtime`.
    pub fn spawn_on<F>(runtime: &runtime::Handle, fut: F) -> Self
    where
        F: Future<Output = Result<Output, WorkError>> + Send + 'static,
    {
        Self::from_join(runtime.spawn(fut))
    }

    /// Adopts an already spawned task.
    pub fn from_join(join: JoinHandle<Result<Output, WorkError>>) -> Self {
        Self::watch(join, |result| match result {
            Ok(output) => Conclusion::Completed(output),
            Err(error) => Conclusion::Failed(error),
        })
    }

    fn from_conclusion(join: JoinHandle<Conclusion>) -> Self {
        Self::watch(join, |conclusion| conclusion)
    }

    fn watch<T: Send + 'static>(join: JoinHandle<T>, map: fn(T) -> Conclusion) -> Self {
        let abort = join.abort_handle();
        let done = async move {
            match join.await {
                Ok(value) => map(value),
                Err(err) => match err.try_into_panic() {
                    Ok(payload) => Conclusion::Failed(WorkError::from_panic(&*payload)),
                    Err(_) => Conclusion::Aborted,
                },
            }
        }
        .boxed()
        .shared();
        Self { abort, done }
    }

    /// Requests cancellation; the task concludes `Aborted` at its next await point.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// True once the task stopped running.
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// Outcome, if some observer already awaited it.
    pub fn peek(&self) -> Option<Conclusion> {
        self.done.peek().cloned()
    }

    /// Future resolving with the task's outcome; cancellation maps to `Aborted`.
    pub fn join(&self) -> Joined {
        self.done.clone()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.abort.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl Bridged for TaskHandle {
    const KIND: WorkKind = WorkKind::Task;

    fn from_work(work: Work) -> Result<Self, BridgeError> {
        match work.into_handle() {
            Handle::Task(task) => Ok(task),
            other => Err(BridgeError::KindMismatch {
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }
}

/// Converts between [`Operation`]s and tokio tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskPlatform;

fn ambient() -> Result<runtime::Handle, BridgeError> {
    runtime::Handle::try_current().map_err(|err| BridgeError::RuntimeUnavailable {
        kind: WorkKind::Task,
        reason: err.to_string(),
    })
}

impl Platform for TaskPlatform {
    fn kind(&self) -> WorkKind {
        WorkKind::Task
    }

    fn forward(&self, operation: Operation) -> Result<Work, BridgeError> {
        let runtime = ambient()?;
        let task = TaskHandle::from_conclusion(runtime.spawn(run_to_conclusion(operation.clone())));
        launch(&operation);
        Ok(task.into())
    }

    fn backward(&self, work: Work) -> Result<Operation, BridgeError> {
        let task = TaskHandle::from_work(work)?;
        let runtime = ambient()?;

        let cancel = task.clone();
        let op = mirror(move || cancel.abort());

        let watched = op.clone();
        let done = task.join();
        runtime.spawn(async move { settle(&watched, done.await) });
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::Phase;
    use crate::testing::eventually;

    #[tokio::test]
    async fn join_reports_completion() {
        let task = TaskHandle::spawn(async { Ok(Output::new(7u8)) });
        let conclusion = task.join().await;
        assert_eq!(conclusion.output().and_then(|o| o.downcast_ref::<u8>()), Some(&7));
        assert!(task.peek().is_some_and(|c| c.is_completed()));
    }

    #[tokio::test]
    async fn join_reports_abort_and_panic() {
        let task = TaskHandle::spawn(futures::future::pending());
        task.abort();
        assert!(task.join().await.is_aborted());

        let task = TaskHandle::spawn(async {
            if true {
                panic!("boom");
            }
            Ok(Output::unit())
        });
        let conclusion = task.join().await;
        assert!(matches!(conclusion.error(), Some(WorkError::Panicked { info }) if info.contains("boom")));
    }

    #[tokio::test]
    async fn forward_starts_and_mirrors_completion() {
        let op = Operation::new();
        let task = TaskHandle::from_work(TaskPlatform.forward(op.clone()).unwrap()).unwrap();
        assert_eq!(op.phase(), Phase::Running);

        op.complete(Output::new("ok")).unwrap();
        assert!(task.join().await.is_completed());
    }

    #[tokio::test]
    async fn forward_task_abort_aborts_operation() {
        let op = Operation::new();
        let task = TaskHandle::from_work(TaskPlatform.forward(op.clone()).unwrap()).unwrap();
        task.abort();

        let conclusion = tokio::time::timeout(Duration::from_secs(2), op.concluded())
            .await
            .expect("operation concludes");
        assert!(conclusion.is_aborted());
    }

    #[tokio::test]
    async fn backward_abort_cancels_task() {
        let task = TaskHandle::spawn(futures::future::pending());
        let op = TaskPlatform.backward(task.clone().into()).unwrap();
        assert_eq!(op.phase(), Phase::Running);

        op.abort().unwrap();
        assert!(task.join().await.is_aborted());
    }

    #[tokio::test]
    async fn backward_settles_with_task_outcome() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = TaskHandle::spawn(async move {
            rx.await.map_err(|_| WorkError::fail("sender dropped"))?;
            Err(WorkError::fail("bad input"))
        });
        let op = TaskPlatform.backward(task.into()).unwrap();
        tx.send(()).unwrap();

        let conclusion = op.concluded().await;
        assert_eq!(conclusion.error().map(|e| e.as_label()), Some("work_failed"));
    }

    #[tokio::test]
    async fn backward_external_cancel_aborts_mirror() {
        let task = TaskHandle::spawn(futures::future::pending());
        let op = TaskPlatform.backward(task.clone().into()).unwrap();
        task.abort();
        eventually(|| op.phase() == Phase::Concluded).await;
        assert!(op.try_conclusion().is_some_and(|c| c.is_aborted()));
    }

    #[test]
    fn conversions_need_a_runtime() {
        let err = TaskPlatform.forward(Operation::new()).unwrap_err();
        assert_eq!(err.as_label(), "bridge_runtime_unavailable");
    }
}
