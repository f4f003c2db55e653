//! # Execution state machine.
//!
//! - [`ExecutionState`], [`Phase`], [`Conclusion`], [`Transition`]: the state model.
//! - [`Operation`]: the canonical handle every runtime is normalized to.
//! - [`OperationBuilder`]: installs start/stop side effects.
//! - [`Output`]: type-erased completion payload.

mod handle;
mod output;
mod state;

pub use handle::{Operation, OperationBuilder};
pub use output::Output;
pub use state::{Conclusion, ExecutionState, Phase, Transition};
