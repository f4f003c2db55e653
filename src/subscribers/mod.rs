//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and,
//! with the `logging` feature, the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                      │
//!                                                     ┌────────────────┼──────────┐
//!                                                     ▼                ▼          ▼
//!                                                 LogWriter         Custom       ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use workvisor::{Event, EventKind, Subscribe};
//!
//! struct Releases;
//!
//! #[async_trait]
//! impl Subscribe for Releases {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::WorkerReleased {
//!             // count releases
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
