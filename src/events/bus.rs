//! # Event bus for supervisor events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]; every supervisor owns one.
//!
//! ```text
//! Publishers (many):                     Consumers:
//!   launch / stop hooks ──┐
//!   sustain loop        ──┼──► Bus ──┬──► subscriber listener ──► SubscriberSet
//!   release loops       ──┤          └──► Supervisor::subscribe() receivers
//!   prune watchers      ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks.
//! - Capacity is one ring buffer shared by all receivers; slow receivers observe
//!   `RecvError::Lagged(n)` and skip the `n` oldest events.
//! - Events published while nobody listens are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_see_events_published_after_subscribing() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::SupervisorStarted));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::WorkerStarted));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::WorkerStarted);
    }
}
