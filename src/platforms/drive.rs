//! Glue shared by the runtime bridges.
//!
//! Each bridge is built from the same few moves: launch the canonical operation,
//! run it to conclusion inside a foreign primitive, mirror a foreign unit with a running
//! operation, and settle that mirror when the foreign unit ends.

use std::future::Future;

use tracing::trace;

use crate::operation::{Conclusion, Operation};

/// Starts `op` unless it already left `Pending`.
pub(crate) fn launch(op: &Operation) {
    if let Err(err) = op.start() {
        trace!(%err, "operation already started");
    }
}

/// Resolves with the conclusion of `op`.
///
/// If the returned future is dropped first (the foreign unit was cancelled), `op` is
/// aborted. The guard is created eagerly so a future dropped before its first poll
/// still aborts.
pub(crate) fn run_to_conclusion(op: Operation) -> impl Future<Output = Conclusion> + Send + 'static {
    let guard = AbortOnDrop(Some(op.clone()));
    async move {
        let mut guard = guard;
        let conclusion = op.concluded().await;
        guard.disarm();
        conclusion
    }
}

/// Running operation standing in for foreign work that is already active.
///
/// Aborting the mirror calls `cancel`.
pub(crate) fn mirror<F>(cancel: F) -> Operation
where
    F: Fn() + Send + Sync + 'static,
{
    Operation::builder()
        .on_stop(move |_, conclusion| {
            if conclusion.is_aborted() {
                cancel();
            }
        })
        .build_running()
}

/// Copies a foreign conclusion onto `op`; a no-op if `op` already concluded.
pub(crate) fn settle(op: &Operation, conclusion: Conclusion) {
    if let Err(err) = op.conclude(conclusion) {
        trace!(%err, "mirror already concluded");
    }
}

struct AbortOnDrop(Option<Operation>);

impl AbortOnDrop {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if let Some(op) = self.0.take() {
            if let Err(err) = op.abort() {
                trace!(%err, "cancelled driver found operation not running");
            }
        }
    }
}
