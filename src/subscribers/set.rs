//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes each event to every subscriber without awaiting
//! their processing. A supervisor builds one when it starts and feeds it from its bus.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//! - **Stop**: [`SubscriberSet::shutdown`] drains the queues; dropping the set instead
//!   stops every worker after its current event and discards the backlog
//!
//! `AssertUnwindSafe` is used around `on_event`; a subscriber that panics while holding
//! a lock on its own shared state may leave that state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
    stop: CancellationToken,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let stop = CancellationToken::new();
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            workers.push(tokio::spawn(deliver(sub, rx, bus.clone(), stop.clone())));
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self {
            channels,
            workers,
            bus,
            stop,
        }
    }

    /// Emits an event to all subscribers (clones the event once).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// Overflow events that themselves overflow are not re-published.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(mut self) {
        self.channels.clear();
        for worker in std::mem::take(&mut self.workers) {
            if let Err(err) = worker.await {
                trace!(%err, "subscriber worker ended abnormally");
            }
        }
    }
}

impl Drop for SubscriberSet {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Feeds one subscriber from its queue until the queue closes or the set is stopped.
async fn deliver(
    sub: Arc<dyn Subscribe>,
    mut rx: mpsc::Receiver<Arc<Event>>,
    bus: Bus,
    stop: CancellationToken,
) {
    loop {
        let ev = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            next = rx.recv() => match next {
                Some(ev) => ev,
                None => break,
            },
        };
        let fut = sub.on_event(ev.as_ref());
        if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            let info = panic_message(&*payload);
            warn!(subscriber = sub.name(), %info, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counter {
        async fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counter"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber exploded");
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let bus = Bus::new(16);
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Counter(Arc::clone(&seen))),
                Arc::new(Counter(Arc::clone(&seen))),
            ],
            bus,
        );
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::WorkerStarted));
        set.emit(&Event::new(EventKind::WorkerReleased));
        set.shutdown().await;
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    struct Slow(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _event: &Event) {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn dropping_the_set_discards_the_backlog() {
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(vec![Arc::new(Slow(Arc::clone(&seen)))], Bus::new(16));
        for _ in 0..5 {
            set.emit(&Event::new(EventKind::WorkerStarted));
        }
        tokio::task::yield_now().await;
        drop(set);

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(seen.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test]
    async fn panics_are_reported_and_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![Arc::new(Panicky), Arc::new(Counter(Arc::clone(&seen)))],
            bus,
        );

        set.emit(&Event::new(EventKind::WorkerStarted));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert!(ev.is_subscriber_panic());
        assert_eq!(ev.subscriber, Some("panicky"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
