//! # Execution state of an operation.
//!
//! ```text
//! Pending ──start──► Running ──abort────► Concluded(Aborted)
//!                            ──complete─► Concluded(Completed(output))
//!                            ──fail─────► Concluded(Failed(error))
//! ```
//!
//! ## Rules
//! - The sequence is strictly forward: nothing ever returns to `Pending` or `Running`.
//! - `Concluded` is terminal and entered at most once.

use std::fmt;

use crate::error::WorkError;
use crate::operation::Output;

/// Coarse position in the lifecycle, without payload.
///
/// Used in errors and events where the conclusion payload is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Created, not started.
    Pending,
    /// Started, not concluded.
    Running,
    /// Terminal.
    Concluded,
}

impl Phase {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Running => "running",
            Phase::Concluded => "concluded",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Mutators of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// `Pending → Running`.
    Start,
    /// `Running → Concluded(Aborted)`.
    Abort,
    /// `Running → Concluded(Completed)`.
    Complete,
    /// `Running → Concluded(Failed)`.
    Fail,
}

impl Transition {
    /// Phase the transition must start from.
    pub fn required_phase(&self) -> Phase {
        match self {
            Transition::Start => Phase::Pending,
            Transition::Abort | Transition::Complete | Transition::Fail => Phase::Running,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Abort => "abort",
            Transition::Complete => "complete",
            Transition::Fail => "fail",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// How an operation ended.
#[derive(Debug, Clone)]
pub enum Conclusion {
    /// Stopped before finishing on its own.
    Aborted,
    /// Finished with an output.
    Completed(Output),
    /// Finished with an error.
    Failed(WorkError),
}

impl Conclusion {
    /// Transition that produces this conclusion.
    pub fn transition(&self) -> Transition {
        match self {
            Conclusion::Aborted => Transition::Abort,
            Conclusion::Completed(_) => Transition::Complete,
            Conclusion::Failed(_) => Transition::Fail,
        }
    }

    /// True if the operation was aborted.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Conclusion::Aborted)
    }

    /// True if the operation completed with an output.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Conclusion::Completed(_))
    }

    /// True if the operation failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Conclusion::Failed(_))
    }

    /// Output of a completed operation.
    pub fn output(&self) -> Option<&Output> {
        match self {
            Conclusion::Completed(output) => Some(output),
            _ => None,
        }
    }

    /// Error of a failed operation.
    pub fn error(&self) -> Option<&WorkError> {
        match self {
            Conclusion::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            Conclusion::Aborted => "aborted",
            Conclusion::Completed(_) => "completed",
            Conclusion::Failed(_) => "failed",
        }
    }
}

/// Full lifecycle state of an [`Operation`](crate::Operation).
#[derive(Debug, Clone, Default)]
pub enum ExecutionState {
    /// Created, not started.
    #[default]
    Pending,
    /// Started, not concluded.
    Running,
    /// Terminal.
    Concluded(Conclusion),
}

impl ExecutionState {
    /// Coarse phase of this state.
    pub fn phase(&self) -> Phase {
        match self {
            ExecutionState::Pending => Phase::Pending,
            ExecutionState::Running => Phase::Running,
            ExecutionState::Concluded(_) => Phase::Concluded,
        }
    }

    /// True once the operation has ever left `Pending`.
    #[inline]
    pub fn has_started(&self) -> bool {
        !matches!(self, ExecutionState::Pending)
    }

    /// True once the operation has reached any conclusion.
    #[inline]
    pub fn has_concluded(&self) -> bool {
        matches!(self, ExecutionState::Concluded(_))
    }

    /// True if the operation has not started.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, ExecutionState::Pending)
    }

    /// True while started and not concluded.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, ExecutionState::Running)
    }

    /// Conclusion, once reached.
    pub fn conclusion(&self) -> Option<&Conclusion> {
        match self {
            ExecutionState::Concluded(conclusion) => Some(conclusion),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_flags_follow_the_sequence() {
        let pending = ExecutionState::Pending;
        assert!(!pending.has_started());
        assert!(!pending.has_concluded());

        let running = ExecutionState::Running;
        assert!(running.has_started());
        assert!(!running.has_concluded());

        let done = ExecutionState::Concluded(Conclusion::Aborted);
        assert!(done.has_started());
        assert!(done.has_concluded());
        assert_eq!(done.phase(), Phase::Concluded);
    }

    #[test]
    fn only_start_leaves_pending() {
        assert_eq!(Transition::Start.required_phase(), Phase::Pending);
        for t in [Transition::Abort, Transition::Complete, Transition::Fail] {
            assert_eq!(t.required_phase(), Phase::Running, "{t}");
        }
    }

    #[test]
    fn conclusion_accessors() {
        let done = Conclusion::Completed(Output::new(7u32));
        assert_eq!(done.output().and_then(|o| o.downcast_ref::<u32>()), Some(&7));
        assert!(done.error().is_none());
        assert_eq!(done.transition(), Transition::Complete);

        let failed = Conclusion::Failed(WorkError::fail("x"));
        assert!(failed.is_failed());
        assert_eq!(failed.as_label(), "failed");
    }
}
