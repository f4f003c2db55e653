//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** each supervisor
//! publishes its lifecycle on.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the supervisor's start/stop hooks and loops, prune watchers,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver handed out by `Supervisor::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
