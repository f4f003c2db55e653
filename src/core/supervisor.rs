//! # Supervisor: tracks heterogeneous workers and cascades shutdown.
//!
//! A [`Supervisor`] is driven by its own canonical [`Operation`]. Requests made before
//! that operation starts are buffered; starting it spawns the loops that drain them;
//! concluding it (by any path) aborts every tracked worker.
//!
//! ## Architecture
//! ```text
//! orchestrate(w) ──► [sustain queue] ─────┐
//! release(w)     ──► [release queue] ─────┼── buffered until start
//! release_all()  ──► [release-all queue] ─┘
//!
//! operation.start()  (start hook)
//!   ├─► spawn subscriber listener: Bus ──► SubscriberSet, publish SupervisorStarted
//!   ├─► drain buffered release / release-all   (nothing tracked yet: no-ops)
//!   ├─► spawn sustain loop:     Work ─► hub view ─► ActiveSet::track ─► start ─► WorkerStarted
//!   ├─► spawn release loop:     WorkId ─► ActiveSet::release ─► abort ─► WorkerReleased
//!   └─► spawn release-all loop: ActiveSet::release_all ─► abort each
//!
//! operation concludes  (stop hook)
//!   └─► ActiveSet::close (abort all) ─► SupervisorConcluded ─► token.cancel() ─► loops exit
//! ```
//!
//! ## Rules
//! - Enqueueing never blocks and is safe from any thread.
//! - A failing worker is reported (`WorkerRejected`) and never stops the loops.
//! - No worker outlives its supervisor: insertions after close are refused and aborted,
//!   and dropping a running supervisor aborts it.
//! - The supervisor is a [`Worker`]: its operation is exposed through the registry as the
//!   kind chosen at build time, so supervisors nest into trees across runtimes.
//!
//! ## Example
//! ```rust
//! use workvisor::{Operation, Phase, Supervisor, SupervisorConfig, Work};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::builder(SupervisorConfig::named("root")).build()?;
//!
//!     let op = Operation::new();
//!     let worker = Work::from(op.clone());
//!     sup.orchestrate(&worker);
//!     assert_eq!(op.phase(), Phase::Pending);
//!
//!     sup.start()?;
//!     while op.phase() != Phase::Running {
//!         tokio::task::yield_now().await;
//!     }
//!
//!     sup.abort()?;
//!     assert!(op.concluded().await.is_aborted());
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::bridge::{Registry, Target};
use crate::core::active::{ActiveSet, Refusal};
use crate::core::builder::SupervisorBuilder;
use crate::core::config::SupervisorConfig;
use crate::error::{BridgeError, LifecycleError, WorkError};
use crate::events::{Bus, Event, EventKind};
use crate::operation::{Conclusion, Operation, Phase};
use crate::platforms::{Bridged, Work, WorkId, WorkKind, Worker};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Orchestrates a dynamic set of workers of any supported runtime.
pub struct Supervisor {
    shared: Arc<Shared>,
    operation: Operation,
    registry: Registry,
    expose: WorkKind,
    exposure: OnceLock<Exposure>,
}

/// The supervisor's own envelope, converted on first request.
struct Exposure {
    work: Work,
    error: Option<BridgeError>,
}

/// State reachable from the operation hooks and the loops.
struct Shared {
    cfg: SupervisorConfig,
    name: Arc<str>,
    bus: Bus,
    hub: Target<Operation>,
    active: ActiveSet,
    token: CancellationToken,
    sustain_tx: mpsc::UnboundedSender<Work>,
    release_tx: mpsc::UnboundedSender<WorkId>,
    release_all_tx: mpsc::UnboundedSender<()>,
    pending: Mutex<Option<Launch>>,
}

/// Everything the start hook consumes.
struct Launch {
    sustain_rx: mpsc::UnboundedReceiver<Work>,
    release_rx: mpsc::UnboundedReceiver<WorkId>,
    release_all_rx: mpsc::UnboundedReceiver<()>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Supervisor {
    /// Returns a builder for a supervisor with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: SupervisorConfig,
        registry: Registry,
        subscribers: Vec<Arc<dyn Subscribe>>,
        expose: WorkKind,
    ) -> Self {
        let (sustain_tx, sustain_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();
        let (release_all_tx, release_all_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            name: Arc::from(cfg.name.as_str()),
            bus: Bus::new(cfg.bus_capacity_clamped()),
            hub: registry.target::<Operation>(),
            active: ActiveSet::new(),
            token: CancellationToken::new(),
            sustain_tx,
            release_tx,
            release_all_tx,
            pending: Mutex::new(Some(Launch {
                sustain_rx,
                release_rx,
                release_all_rx,
                subscribers,
            })),
            cfg,
        });

        let on_start = Arc::clone(&shared);
        let on_stop = Arc::clone(&shared);
        let operation = Operation::builder()
            .on_start(move |op| on_start.launch(op))
            .on_stop(move |_, conclusion| on_stop.shut_down(conclusion))
            .build();

        Self {
            shared,
            operation,
            registry,
            expose,
            exposure: OnceLock::new(),
        }
    }

    /// Supervisor name from the configuration.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The canonical operation driving this supervisor.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Starts the supervisor's operation.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.operation.start()
    }

    /// Aborts the supervisor's operation, and with it every tracked worker.
    pub fn abort(&self) -> Result<(), LifecycleError> {
        self.operation.abort()
    }

    /// Enqueues `worker` for supervision.
    pub fn orchestrate<W: Worker + ?Sized>(&self, worker: &W) {
        self.shared.enqueue_sustain(worker.work());
    }

    /// Enqueues each worker, in iteration order.
    pub fn orchestrate_all<I>(&self, workers: I)
    where
        I: IntoIterator,
        I::Item: Worker,
    {
        for worker in workers {
            self.shared.enqueue_sustain(worker.work());
        }
    }

    /// Enqueues a stop-and-forget for `worker`; ignored if it is not tracked.
    pub fn release<W: Worker + ?Sized>(&self, worker: &W) {
        let id = worker.work().id();
        if self.shared.release_tx.send(id).is_err() {
            self.shared.dropped("release", Some(id));
        }
    }

    /// Enqueues an abort-and-forget of every tracked worker.
    pub fn release_all(&self) {
        if self.shared.release_all_tx.send(()).is_err() {
            self.shared.dropped("release_all", None);
        }
    }

    /// Ids of the tracked workers, sorted.
    pub fn active(&self) -> Vec<WorkId> {
        self.shared.active.ids()
    }

    /// Number of tracked workers.
    pub fn active_len(&self) -> usize {
        self.shared.active.len()
    }

    /// True if `worker` is currently tracked.
    pub fn tracks<W: Worker + ?Sized>(&self, worker: &W) -> bool {
        self.shared.active.contains(worker.work().id())
    }

    /// Receiver for this supervisor's events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Kind this supervisor is exposed as.
    pub fn exposed_kind(&self) -> WorkKind {
        self.expose
    }

    /// The supervisor's envelope as the exposed kind.
    ///
    /// Converted on first call. Converting to a foreign kind starts the supervisor.
    pub fn exposed(&self) -> Result<Work, BridgeError> {
        let exposure = self.exposure();
        match &exposure.error {
            Some(err) => Err(err.clone()),
            None => Ok(exposure.work.clone()),
        }
    }

    /// The supervisor as a handle of type `T`.
    ///
    /// For the exposed kind this is the exposed handle. Other kinds are converted afresh
    /// on every call.
    pub fn handle<T: Bridged>(&self) -> Result<T, BridgeError> {
        if T::KIND == self.expose {
            return T::from_work(self.exposed()?);
        }
        self.registry
            .target::<T>()
            .convert(Work::from(self.operation.clone()))
    }

    fn exposure(&self) -> &Exposure {
        self.exposure.get_or_init(|| {
            let canonical = Work::from(self.operation.clone());
            match self.registry.convert(canonical.clone(), self.expose) {
                Ok(work) => Exposure { work, error: None },
                Err(err) => {
                    warn!(supervisor = %self.shared.name, %err, "exposing canonical handle instead");
                    Exposure {
                        work: canonical,
                        error: Some(err),
                    }
                }
            }
        })
    }
}

impl Worker for Supervisor {
    fn work(&self) -> Work {
        self.exposure().work.clone()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        match self.operation.phase() {
            Phase::Running => {
                if let Err(err) = self.operation.abort() {
                    trace!(supervisor = %self.shared.name, %err, "supervisor concluded concurrently");
                }
            }
            Phase::Pending => {
                drop(self.shared.pending.lock().take());
                self.shared.token.cancel();
            }
            Phase::Concluded => {}
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.shared.name)
            .field("phase", &self.operation.phase())
            .field("active", &self.shared.active.len())
            .field("expose", &self.expose)
            .finish()
    }
}

impl Shared {
    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind).with_supervisor(Arc::clone(&self.name))
    }

    fn dropped(&self, request: &'static str, worker: Option<WorkId>) {
        trace!(supervisor = %self.name, request, "request after conclusion dropped");
        let mut ev = self.event(EventKind::RequestDropped).with_reason(request);
        if let Some(id) = worker {
            ev = ev.with_worker(id);
        }
        self.bus.publish(ev);
    }

    fn enqueue_sustain(&self, work: Work) {
        let id = work.id();
        if self.active.is_closed() || self.sustain_tx.send(work).is_err() {
            self.dropped("orchestrate", Some(id));
        }
    }

    /// Start hook.
    fn launch(self: &Arc<Self>, op: &Operation) {
        let runtime = match runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(supervisor = %self.name, %err, "supervisor started outside a tokio runtime");
                let error = WorkError::fail(format!("supervisor needs a tokio runtime: {err}"));
                if let Err(err) = op.fail(error) {
                    trace!(%err, "supervisor concluded concurrently");
                }
                return;
            }
        };
        let Some(launch) = self.pending.lock().take() else {
            return;
        };
        let Launch {
            sustain_rx,
            mut release_rx,
            mut release_all_rx,
            subscribers,
        } = launch;

        let rx = self.bus.subscribe();
        let set = SubscriberSet::new(subscribers, self.bus.clone());
        runtime.spawn(listen(rx, self.token.clone(), set));

        debug!(supervisor = %self.name, "supervisor started");
        self.bus.publish(self.event(EventKind::SupervisorStarted));

        // Nothing is tracked yet, so buffered releases only report themselves.
        while let Ok(id) = release_rx.try_recv() {
            self.release(id);
        }
        while let Ok(()) = release_all_rx.try_recv() {
            self.release_all();
        }

        runtime.spawn(Arc::clone(self).sustain_loop(sustain_rx));
        runtime.spawn(Arc::clone(self).release_loop(release_rx));
        runtime.spawn(Arc::clone(self).release_all_loop(release_all_rx));
    }

    /// Stop hook.
    fn shut_down(&self, conclusion: &Conclusion) {
        drop(self.pending.lock().take());
        let aborted = self.active.close();
        debug!(
            supervisor = %self.name,
            conclusion = conclusion.as_label(),
            aborted = aborted.len(),
            "supervisor concluded"
        );
        for (id, kind) in aborted {
            self.bus.publish(
                self.event(EventKind::WorkerReleased)
                    .with_worker(id)
                    .with_work_kind(kind),
            );
        }
        self.bus.publish(
            self.event(EventKind::SupervisorConcluded)
                .with_reason(conclusion.as_label()),
        );
        self.token.cancel();
    }

    async fn sustain_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Work>) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(work) => self.sustain(work),
                    None => break,
                },
            }
        }
        rx.close();
        while let Ok(work) = rx.try_recv() {
            self.dropped("orchestrate", Some(work.id()));
        }
    }

    async fn release_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<WorkId>) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(id) => self.release(id),
                    None => break,
                },
            }
        }
    }

    async fn release_all_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(()) => self.release_all(),
                    None => break,
                },
            }
        }
    }

    /// Converts, tracks and starts one worker.
    fn sustain(self: &Arc<Self>, work: Work) {
        let id = work.id();
        let kind = work.kind();
        let reject = |reason: &'static str| {
            debug!(supervisor = %self.name, worker = %id, %kind, reason, "worker rejected");
            self.bus.publish(
                self.event(EventKind::WorkerRejected)
                    .with_worker(id)
                    .with_work_kind(kind)
                    .with_reason(reason),
            );
        };

        let op = match self.hub.convert(work) {
            Ok(op) => op,
            Err(err) => return reject(err.as_label()),
        };

        if let Err(refusal) = self.active.track(id, kind, &op) {
            if refusal == Refusal::Closed {
                abort_untracked(id, &op);
            }
            return reject(refusal.as_label());
        }

        match op.start() {
            Ok(()) => {}
            // Foreign workers are mirrored by operations that are already running.
            Err(LifecycleError::IllegalTransition {
                from: Phase::Running,
                ..
            }) => {}
            Err(err) => {
                self.active.forget_concluded(id, &op);
                return reject(err.as_label());
            }
        }

        if !self.active.is_tracking(id, &op) {
            abort_untracked(id, &op);
            return;
        }

        self.bus.publish(
            self.event(EventKind::WorkerStarted)
                .with_worker(id)
                .with_work_kind(kind),
        );

        if self.cfg.prune_concluded {
            let shared = Arc::clone(self);
            tokio::spawn(async move {
                let conclusion = op.concluded().await;
                if let Some(kind) = shared.active.forget_concluded(id, &op) {
                    shared.bus.publish(
                        shared
                            .event(EventKind::WorkerConcluded)
                            .with_worker(id)
                            .with_work_kind(kind)
                            .with_reason(conclusion.as_label()),
                    );
                }
            });
        }
    }

    fn release(&self, id: WorkId) {
        match self.active.release(id) {
            Some(kind) => self.bus.publish(
                self.event(EventKind::WorkerReleased)
                    .with_worker(id)
                    .with_work_kind(kind),
            ),
            None => self
                .bus
                .publish(self.event(EventKind::ReleaseIgnored).with_worker(id)),
        }
    }

    fn release_all(&self) {
        for (id, kind) in self.active.release_all() {
            self.bus.publish(
                self.event(EventKind::WorkerReleased)
                    .with_worker(id)
                    .with_work_kind(kind),
            );
        }
    }
}

fn abort_untracked(id: WorkId, op: &Operation) {
    if let Err(err) = op.abort() {
        trace!(worker = %id, %err, "untracked worker not running");
    }
}

/// Forwards bus events to the subscriber set until cancelled, then drains and shuts it down.
async fn listen(mut rx: broadcast::Receiver<Event>, token: CancellationToken, set: SubscriberSet) {
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = token.cancelled() => break,
        }
    }
    loop {
        match rx.try_recv() {
            Ok(ev) => set.emit(&ev),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    set.shutdown().await;
}
