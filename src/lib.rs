//! # workvisor
//!
//! **Workvisor** supervises units of asynchronous work that come from different
//! concurrency runtimes.
//!
//! Every unit is normalized to one canonical state machine, the [`Operation`]. Tokio
//! tasks and thread-pool futures are bridged into and out of it, and a [`Supervisor`]
//! starts, stops and cascades shutdown across any mix of them. A supervisor is itself
//! a worker of whatever kind its owner asks for, so supervisors compose into trees.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ Operation  │   │ TaskHandle │   │ FutureHandle │   │  Supervisor  │
//!   │ (canonical)│   │  (tokio)   │   │ (ThreadPool) │   │ (as worker)  │
//!   └─────┬──────┘   └─────┬──────┘   └──────┬───────┘   └──────┬───────┘
//!         └──────── Work { id, kind, handle } ───────────────────┘
//!                                │ orchestrate / release
//!                                ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                        │
//! │  - request queues (buffered until start)                           │
//! │  - Target<Operation> view of the Registry (normalizes every kind)  │
//! │  - ActiveSet: WorkId → Operation                                   │
//! │  - Bus ──► SubscriberSet                                           │
//! └──────────────────────────────┬─────────────────────────────────────┘
//!                                ▼
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Registry: Route { from, to } → Converter                          │
//! │                                                                    │
//! │        Task ◄──forward── Operation ──forward──► Future             │
//! │        Task ──backward─► Operation ◄─backward── Future             │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Pending ──start──► Running ──abort──────► Concluded(Aborted)
//!                           ├──complete───► Concluded(Completed(output))
//!                           └──fail───────► Concluded(Failed(error))
//!
//! Supervisor:
//!   Pending   requests buffered, nothing happens to workers
//!   Running   loops drain requests: convert ─► track ─► start
//!   Concluded every tracked worker aborted, later requests dropped
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **State machine** | Start-once, conclude-once lifecycle with hooks.              | [`Operation`], [`ExecutionState`]         |
//! | **Bridges**       | Convert between the canonical handle and foreign runtimes.   | [`Platform`], [`TaskHandle`], [`Work`]    |
//! | **Registry**      | Route lookup and typed conversion views.                     | [`Registry`], [`Target`]                  |
//! | **Supervision**   | Track, start, release and cascade shutdown of workers.       | [`Supervisor`], [`Worker`]                |
//! | **Subscriber API**| Hook into supervisor events.                                 | [`Subscribe`], [`Event`]                  |
//! | **Errors**        | Typed errors with stable labels.                             | [`LifecycleError`], [`BridgeError`]       |
//! | **Configuration** | Per-supervisor settings.                                     | [`SupervisorConfig`]                      |
//!
//! ## Optional features
//! - `futures-pool` _(default)_: the `futures` thread-pool bridge ([`FutureHandle`]).
//! - `logging`: exports a built-in [`LogWriter`] that renders events with `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use workvisor::{Phase, Supervisor, SupervisorConfig, TaskHandle, Work};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn workvisor::Subscribe>> = vec![Arc::new(workvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn workvisor::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(SupervisorConfig::named("root"))
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let task = TaskHandle::spawn(futures::future::pending());
//!     sup.orchestrate(&Work::from(task.clone()));
//!     sup.start()?;
//!
//!     while sup.active_len() == 0 {
//!         tokio::task::yield_now().await;
//!     }
//!
//!     // Concluding the supervisor aborts everything it tracks.
//!     sup.abort()?;
//!     assert!(task.join().await.is_aborted());
//!     assert_eq!(sup.operation().phase(), Phase::Concluded);
//!     Ok(())
//! }
//! ```
mod bridge;
mod core;
mod error;
mod events;
mod operation;
mod platforms;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use bridge::{Converter, Registry, RegistryBuilder, Route, Target};
pub use crate::core::{Supervisor, SupervisorBuilder, SupervisorConfig};
pub use error::{BridgeError, LifecycleError, WorkError};
pub use events::{Bus, Event, EventKind};
pub use operation::{
    Conclusion, ExecutionState, Operation, OperationBuilder, Output, Phase, Transition,
};
pub use platforms::{
    Bridged, Handle, Joined, OperationPlatform, Platform, TaskHandle, TaskPlatform, Work, WorkId,
    WorkKind, Worker, available,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: the thread-pool bridge.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "futures-pool")]
pub use platforms::{FutureHandle, FuturePlatform};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
