//! Test helpers: bounded polling instead of fixed sleeps.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

use crate::events::{Event, EventKind};

const DEADLINE: Duration = Duration::from_secs(2);

/// Polls `cond` until it holds; panics after two seconds.
pub(crate) async fn eventually<F: FnMut() -> bool>(mut cond: F) {
    let deadline = Instant::now() + DEADLINE;
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached within {DEADLINE:?}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Receives until an event of `kind` arrives; panics after two seconds.
pub(crate) async fn next_event(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("bus closed while waiting for {kind:?}"),
            }
        }
    };
    tokio::time::timeout(DEADLINE, wait)
        .await
        .unwrap_or_else(|_| panic!("no {kind:?} within {DEADLINE:?}"))
}
