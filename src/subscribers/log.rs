//! # LogWriter: events rendered through `tracing`.
//!
//! A minimal subscriber for demos and debugging. Install a `tracing` subscriber
//! (e.g. `tracing_subscriber::fmt`) to see the output.
//!
//! ## Example output
//! ```text
//! INFO workvisor: supervisor started supervisor="root"
//! INFO workvisor: worker started supervisor="root" worker=work#3 kind=task
//! WARN workvisor: worker rejected supervisor="root" worker=work#4 kind=task reason=bridge_runtime_unavailable
//! INFO workvisor: supervisor concluded supervisor="root" reason=aborted
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let supervisor = e.supervisor.as_deref().unwrap_or("-");
        let worker = e.worker.map(|id| id.to_string()).unwrap_or_default();
        let kind = e.work_kind.map(|k| k.as_label()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::SupervisorStarted => {
                info!(target: "workvisor", supervisor, "supervisor started");
            }
            EventKind::SupervisorConcluded => {
                info!(target: "workvisor", supervisor, reason, "supervisor concluded");
            }
            EventKind::WorkerStarted => {
                info!(target: "workvisor", supervisor, worker, kind, "worker started");
            }
            EventKind::WorkerRejected => {
                warn!(target: "workvisor", supervisor, worker, kind, reason, "worker rejected");
            }
            EventKind::WorkerReleased => {
                info!(target: "workvisor", supervisor, worker, kind, "worker released");
            }
            EventKind::WorkerConcluded => {
                info!(target: "workvisor", supervisor, worker, kind, reason, "worker concluded");
            }
            EventKind::ReleaseIgnored => {
                debug!(target: "workvisor", supervisor, worker, "release ignored");
            }
            EventKind::RequestDropped => {
                debug!(target: "workvisor", supervisor, worker, reason, "request dropped");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "workvisor", subscriber = e.subscriber, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "workvisor", subscriber = e.subscriber, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
