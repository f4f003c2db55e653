//! # Events emitted by supervisors and the subscriber fan-out.
//!
//! The [`EventKind`] enum classifies events into three groups:
//! - **Supervisor lifecycle**: the supervisor's own start and conclusion
//! - **Worker management**: workers accepted, rejected, released, concluded
//! - **Subscriber health**: fan-out overflow and subscriber panics
//!
//! The [`Event`] struct carries the metadata: supervisor name, worker id and kind, reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use workvisor::{Event, EventKind, WorkKind};
//!
//! let ev = Event::new(EventKind::WorkerRejected)
//!     .with_supervisor("root")
//!     .with_work_kind(WorkKind::Task)
//!     .with_reason("bridge_runtime_unavailable");
//!
//! assert_eq!(ev.kind, EventKind::WorkerRejected);
//! assert_eq!(ev.supervisor.as_deref(), Some("root"));
//! assert_eq!(ev.reason.as_deref(), Some("bridge_runtime_unavailable"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::platforms::{WorkId, WorkKind};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `subscriber` and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `subscriber` and `reason` (`"full"` or `"closed"`).
    SubscriberOverflow,

    // === Supervisor lifecycle ===
    /// The supervisor's operation started and its loops are running.
    ///
    /// Sets `supervisor`.
    SupervisorStarted,

    /// The supervisor's operation concluded; every tracked worker was aborted.
    ///
    /// Sets `supervisor`, `reason` (conclusion label).
    SupervisorConcluded,

    // === Worker management ===
    /// A worker was converted, tracked and started.
    ///
    /// Sets `supervisor`, `worker`, `work_kind`.
    WorkerStarted,

    /// A worker could not be supervised.
    ///
    /// Sets `supervisor`, `worker`, `work_kind`, `reason` (error label).
    WorkerRejected,

    /// A tracked worker was released (removed and aborted).
    ///
    /// Sets `supervisor`, `worker`, `work_kind`.
    WorkerReleased,

    /// A tracked worker concluded on its own and was pruned.
    ///
    /// Sets `supervisor`, `worker`, `work_kind`, `reason` (conclusion label).
    WorkerConcluded,

    /// Release requested for a worker that is not tracked.
    ///
    /// Sets `supervisor`, `worker`.
    ReleaseIgnored,

    /// A request arrived after the supervisor concluded and was dropped.
    ///
    /// Sets `supervisor`, `reason` (request name); `worker` when known.
    RequestDropped,
}

impl EventKind {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SupervisorStarted => "supervisor_started",
            EventKind::SupervisorConcluded => "supervisor_concluded",
            EventKind::WorkerStarted => "worker_started",
            EventKind::WorkerRejected => "worker_rejected",
            EventKind::WorkerReleased => "worker_released",
            EventKind::WorkerConcluded => "worker_concluded",
            EventKind::ReleaseIgnored => "release_ignored",
            EventKind::RequestDropped => "request_dropped",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the publishing supervisor.
    pub supervisor: Option<Arc<str>>,
    /// Worker the event is about.
    pub worker: Option<WorkId>,
    /// Runtime kind of that worker, as submitted.
    pub work_kind: Option<WorkKind>,
    /// Human-readable reason (error labels, conclusion labels, overflow details).
    pub reason: Option<Arc<str>>,
    /// Subscriber name, for subscriber health events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            supervisor: None,
            worker: None,
            work_kind: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the publishing supervisor's name.
    #[inline]
    pub fn with_supervisor(mut self, name: impl Into<Arc<str>>) -> Self {
        self.supervisor = Some(name.into());
        self
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, id: WorkId) -> Self {
        self.worker = Some(id);
        self
    }

    /// Attaches a worker kind.
    #[inline]
    pub fn with_work_kind(mut self, kind: WorkKind) -> Self {
        self.work_kind = Some(kind);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
