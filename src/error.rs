//! Error types used by operations, the bridge and supervised work.
//!
//! This module defines three error enums:
//!
//! - [`LifecycleError`]: a state-machine mutator was called from a state that forbids it.
//! - [`BridgeError`]: a unit of work could not be converted between runtimes.
//! - [`WorkError`]: the failure payload carried by [`Conclusion::Failed`](crate::Conclusion::Failed).
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging and events.

use std::sync::Arc;

use thiserror::Error;

use crate::operation::{Phase, Transition};
use crate::platforms::WorkKind;

/// # Errors produced by the execution state machine.
///
/// Always a caller error: never retried, surfaced immediately.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `action` is not legal while the operation is in `from`.
    #[error("illegal transition: cannot {action} while {from}")]
    IllegalTransition {
        /// Phase the operation was in when the mutator was called.
        from: Phase,
        /// The rejected mutator.
        action: Transition,
    },
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use workvisor::{LifecycleError, Phase, Transition};
    ///
    /// let err = LifecycleError::IllegalTransition { from: Phase::Pending, action: Transition::Abort };
    /// assert_eq!(err.as_label(), "lifecycle_illegal_transition");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::IllegalTransition { .. } => "lifecycle_illegal_transition",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LifecycleError::IllegalTransition { from, action } => {
                format!("{action} rejected in phase {from}")
            }
        }
    }
}

/// # Errors produced while converting work between runtimes.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No registered platform covers the `from → to` route.
    #[error("no converter available from {from} to {to}")]
    NoConverterAvailable {
        /// Kind of the envelope being converted.
        from: WorkKind,
        /// Requested target kind.
        to: WorkKind,
    },

    /// The envelope holds a different handle than the converter expects.
    #[error("kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Kind the converter accepts.
        expected: WorkKind,
        /// Kind actually found in the envelope.
        found: WorkKind,
    },

    /// The foreign runtime cannot be reached from the calling context.
    #[error("{kind} runtime unavailable: {reason}")]
    RuntimeUnavailable {
        /// Kind whose runtime is missing.
        kind: WorkKind,
        /// Why the runtime could not be used.
        reason: String,
    },
}

impl BridgeError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use workvisor::{BridgeError, WorkKind};
    ///
    /// let err = BridgeError::NoConverterAvailable { from: WorkKind::Task, to: WorkKind::Operation };
    /// assert_eq!(err.as_label(), "bridge_no_converter");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::NoConverterAvailable { .. } => "bridge_no_converter",
            BridgeError::KindMismatch { .. } => "bridge_kind_mismatch",
            BridgeError::RuntimeUnavailable { .. } => "bridge_runtime_unavailable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BridgeError::NoConverterAvailable { from, to } => format!("route {from}->{to} missing"),
            BridgeError::KindMismatch { expected, found } => {
                format!("expected {expected} handle, got {found}")
            }
            BridgeError::RuntimeUnavailable { kind, reason } => format!("{kind}: {reason}"),
        }
    }
}

/// # Failure of a unit of work.
///
/// Carried by [`Conclusion::Failed`](crate::Conclusion::Failed). Cheap to clone so that
/// every observer of a conclusion sees the same failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum WorkError {
    /// Execution failed with a message.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A bridged foreign unit panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload, when it was a string.
        info: String,
    },

    /// Arbitrary underlying error, preserved as-is.
    #[error(transparent)]
    Source(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl WorkError {
    /// Builds a [`WorkError::Fail`] from any message.
    pub fn fail(error: impl Into<String>) -> Self {
        WorkError::Fail {
            error: error.into(),
        }
    }

    /// Wraps an arbitrary error, keeping it reachable through [`WorkError::source_ref`].
    pub fn source<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WorkError::Source(Arc::new(error))
    }

    /// Returns the preserved underlying error, if any.
    pub fn source_ref(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            WorkError::Source(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use workvisor::WorkError;
    ///
    /// assert_eq!(WorkError::fail("boom").as_label(), "work_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Fail { .. } => "work_failed",
            WorkError::Panicked { .. } => "work_panicked",
            WorkError::Source(_) => "work_source_error",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkError::Fail { error } => format!("error: {error}"),
            WorkError::Panicked { info } => format!("panic: {info}"),
            WorkError::Source(err) => format!("source: {err}"),
        }
    }

    /// Builds a [`WorkError::Panicked`] from a panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        WorkError::Panicked {
            info: panic_message(payload),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn source_error_is_preserved() {
        let err = WorkError::source(DiskFull);
        assert_eq!(err.to_string(), "disk full");
        let inner = err.source_ref().expect("source kept");
        assert!(inner.downcast_ref::<DiskFull>().is_some());
        assert_eq!(err.as_label(), "work_source_error");
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = WorkError::from_panic(&"static boom");
        assert!(matches!(err, WorkError::Panicked { ref info } if info == "static boom"));

        let err = WorkError::from_panic(&String::from("owned boom"));
        assert_eq!(err.as_message(), "panic: owned boom");

        let err = WorkError::from_panic(&42u8);
        assert_eq!(err.as_message(), "panic: unknown panic");
    }

    #[test]
    fn lifecycle_error_renders_phase_and_action() {
        let err = LifecycleError::IllegalTransition {
            from: Phase::Concluded,
            action: Transition::Start,
        };
        assert_eq!(err.to_string(), "illegal transition: cannot start while concluded");
        assert_eq!(err.as_message(), "start rejected in phase concluded");
    }

    #[test]
    fn bridge_error_labels_are_stable() {
        let err = BridgeError::KindMismatch {
            expected: WorkKind::Operation,
            found: WorkKind::Task,
        };
        assert_eq!(err.as_label(), "bridge_kind_mismatch");
        assert_eq!(err.to_string(), "kind mismatch: expected operation, found task");
    }
}
