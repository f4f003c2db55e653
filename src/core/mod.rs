//! Supervision core.
//!
//! The public API from this module is [`Supervisor`], its [`SupervisorBuilder`] and
//! [`SupervisorConfig`].
//!
//! Internal modules:
//! - [`supervisor`]: request queues, start/stop hooks, sustain and release loops;
//! - [`active`]: the set of tracked workers;
//! - [`builder`]: registry selection and exposure validation;
//! - [`config`]: per-supervisor settings.

mod active;
mod builder;
mod config;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervisor::Supervisor;
