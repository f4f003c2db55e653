//! # Operation: the canonical lifecycle handle.
//!
//! An [`Operation`] is a cheap-to-clone handle over one state cell. Every runtime bridged
//! by this crate is normalized to it, and the supervisor only ever drives operations.
//!
//! ## Architecture
//! ```text
//! start()/abort()/complete()/fail()
//!        │
//!        ▼
//! watch::Sender<ExecutionState>::send_if_modified   (single write lock per handle)
//!        │  ├─ illegal → LifecycleError::IllegalTransition (state untouched)
//!        │  └─ legal   → state replaced, receivers notified
//!        ▼
//! hook (on_start / on_stop), outside the lock, on the caller's thread
//! ```
//!
//! ## Rules
//! - Exactly one of any set of racing mutators wins; the rest fail.
//! - Hooks run once, after the new state is visible, before the mutator returns.
//! - [`Operation::concluded`] resolves for every observer, including late ones.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::error::{LifecycleError, WorkError};
use crate::operation::{Conclusion, ExecutionState, Output, Phase, Transition};

type StartHook = Box<dyn Fn(&Operation) + Send + Sync>;
type StopHook = Box<dyn Fn(&Operation, &Conclusion) + Send + Sync>;

struct Inner {
    state: watch::Sender<ExecutionState>,
    on_start: Option<StartHook>,
    on_stop: Option<StopHook>,
}

/// Canonical handle for a unit of work that starts once and concludes once.
///
/// # Example
/// ```
/// use workvisor::{Conclusion, Operation, Output};
///
/// let op = Operation::new();
/// op.start().unwrap();
/// op.complete(Output::new(42u32)).unwrap();
///
/// assert!(op.start().is_err());
/// let state = op.state();
/// let conclusion = state.conclusion().unwrap();
/// assert_eq!(conclusion.output().unwrap().downcast_ref::<u32>(), Some(&42));
/// ```
#[derive(Clone)]
pub struct Operation {
    inner: Arc<Inner>,
}

impl Operation {
    /// Creates a pending operation without side effects.
    pub fn new() -> Self {
        OperationBuilder::new().build()
    }

    /// Returns a builder for installing start/stop side effects.
    pub fn builder() -> OperationBuilder {
        OperationBuilder::new()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ExecutionState {
        self.inner.state.borrow().clone()
    }

    /// Current phase (cheaper than [`Operation::state`], no payload clone).
    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase()
    }

    /// Conclusion if already reached, without waiting.
    pub fn try_conclusion(&self) -> Option<Conclusion> {
        self.inner.state.borrow().conclusion().cloned()
    }

    /// `Pending → Running`, then runs the start hook.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.enter(Transition::Start, ExecutionState::Running)?;
        if let Some(hook) = &self.inner.on_start {
            hook(self);
        }
        Ok(())
    }

    /// `Running → Concluded(Aborted)`, then runs the stop hook.
    pub fn abort(&self) -> Result<(), LifecycleError> {
        self.conclude(Conclusion::Aborted)
    }

    /// `Running → Concluded(Completed(output))`, then runs the stop hook.
    pub fn complete(&self, output: Output) -> Result<(), LifecycleError> {
        self.conclude(Conclusion::Completed(output))
    }

    /// `Running → Concluded(Failed(error))`, then runs the stop hook.
    pub fn fail(&self, error: WorkError) -> Result<(), LifecycleError> {
        self.conclude(Conclusion::Failed(error))
    }

    /// Moves a running operation into `conclusion`.
    pub fn conclude(&self, conclusion: Conclusion) -> Result<(), LifecycleError> {
        let action = conclusion.transition();
        self.enter(action, ExecutionState::Concluded(conclusion.clone()))?;
        if let Some(hook) = &self.inner.on_stop {
            hook(self, &conclusion);
        }
        Ok(())
    }

    /// Resolves with the conclusion the first time one is reached.
    ///
    /// Resolves immediately when the operation has already concluded. The returned
    /// future keeps the operation alive; it never resolves for an operation that is
    /// never concluded.
    pub fn concluded(&self) -> BoxFuture<'static, Conclusion> {
        let inner = Arc::clone(&self.inner);
        let mut rx = inner.state.subscribe();
        async move {
            let _keep_alive = inner;
            // The sender lives in `_keep_alive`, so `wait_for` only returns once the
            // predicate holds.
            rx.wait_for(ExecutionState::has_concluded)
                .await
                .ok()
                .and_then(|state| state.conclusion().cloned())
                .unwrap_or(Conclusion::Aborted)
        }
        .boxed()
    }

    /// Receiver over the raw state cell.
    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.inner.state.subscribe()
    }

    /// True if both handles refer to the same operation.
    pub fn ptr_eq(&self, other: &Operation) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Applies `next` if the current phase allows `action`.
    ///
    /// The check and the write happen under the state cell's write lock.
    fn enter(&self, action: Transition, next: ExecutionState) -> Result<(), LifecycleError> {
        let mut outcome = Ok(());
        self.inner.state.send_if_modified(|state| {
            let from = state.phase();
            if from != action.required_phase() {
                outcome = Err(LifecycleError::IllegalTransition { from, action });
                return false;
            }
            *state = next;
            true
        });
        outcome
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Operation`] side effects.
#[derive(Default)]
pub struct OperationBuilder {
    on_start: Option<StartHook>,
    on_stop: Option<StopHook>,
}

impl OperationBuilder {
    /// Creates a builder without hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` right after a successful `start`.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Operation) + Send + Sync + 'static,
    {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Runs `hook` right after the operation concludes, whichever way.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Operation, &Conclusion) + Send + Sync + 'static,
    {
        self.on_stop = Some(Box::new(hook));
        self
    }

    /// Builds a pending operation.
    pub fn build(self) -> Operation {
        self.build_in(ExecutionState::Pending)
    }

    /// Builds an operation that is already running.
    ///
    /// The start hook is not run. Used to mirror foreign work that is active from the
    /// moment it exists.
    pub fn build_running(self) -> Operation {
        self.build_in(ExecutionState::Running)
    }

    fn build_in(self, initial: ExecutionState) -> Operation {
        let (state, _rx) = watch::channel(initial);
        Operation {
            inner: Arc::new(Inner {
                state,
                on_start: self.on_start,
                on_stop: self.on_stop,
            }),
        }
    }
}
