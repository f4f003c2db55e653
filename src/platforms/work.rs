//! # Work envelopes and workers.
//!
//! A [`Work`] pairs a concurrency handle with its runtime kind and a stable identity.
//! The kind is the only thing the supervisor consults to pick a converter; the
//! identity is how it recognises the same worker across `orchestrate`/`release`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::BridgeError;
use crate::operation::Operation;
use crate::platforms::{TaskHandle, WorkKind};

#[cfg(feature = "futures-pool")]
use crate::platforms::FutureHandle;

/// Global sequence for envelope identities.
static WORK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of a work envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkId(u64);

impl WorkId {
    fn next() -> Self {
        Self(WORK_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work#{}", self.0)
    }
}

/// Concurrency handle of one of the supported runtimes.
#[derive(Clone)]
pub enum Handle {
    /// Canonical state machine.
    Operation(Operation),
    /// Tokio task.
    Task(TaskHandle),
    /// Future on a `futures` thread pool.
    #[cfg(feature = "futures-pool")]
    Future(FutureHandle),
}

impl Handle {
    /// Runtime kind of this handle.
    pub fn kind(&self) -> WorkKind {
        match self {
            Handle::Operation(_) => WorkKind::Operation,
            Handle::Task(_) => WorkKind::Task,
            #[cfg(feature = "futures-pool")]
            Handle::Future(_) => WorkKind::Future,
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Operation(op) => f.debug_tuple("Operation").field(op).finish(),
            Handle::Task(task) => f.debug_tuple("Task").field(task).finish(),
            #[cfg(feature = "futures-pool")]
            Handle::Future(fut) => f.debug_tuple("Future").field(fut).finish(),
        }
    }
}

/// Work envelope: handle + kind + identity.
///
/// Cloning keeps the identity; building a new envelope around the same handle does not.
#[derive(Clone, Debug)]
pub struct Work {
    id: WorkId,
    handle: Handle,
}

impl Work {
    /// Wraps `handle` in a fresh envelope.
    pub fn new(handle: Handle) -> Self {
        Self {
            id: WorkId::next(),
            handle,
        }
    }

    /// Identity of this envelope.
    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Runtime kind tag.
    pub fn kind(&self) -> WorkKind {
        self.handle.kind()
    }

    /// Borrows the handle.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Unwraps the handle.
    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl From<Operation> for Work {
    fn from(op: Operation) -> Self {
        Work::new(Handle::Operation(op))
    }
}

impl From<TaskHandle> for Work {
    fn from(task: TaskHandle) -> Self {
        Work::new(Handle::Task(task))
    }
}

#[cfg(feature = "futures-pool")]
impl From<FutureHandle> for Work {
    fn from(fut: FutureHandle) -> Self {
        Work::new(Handle::Future(fut))
    }
}

/// Anything that can be supervised.
///
/// Implementors must return the same envelope (same [`WorkId`]) on every call: the
/// supervisor matches `release` requests against earlier `orchestrate` requests by id.
pub trait Worker {
    /// The envelope describing this worker's unit of work.
    fn work(&self) -> Work;
}

impl Worker for Work {
    fn work(&self) -> Work {
        self.clone()
    }
}

impl<W: Worker + ?Sized> Worker for &W {
    fn work(&self) -> Work {
        (**self).work()
    }
}

impl<W: Worker + ?Sized> Worker for std::sync::Arc<W> {
    fn work(&self) -> Work {
        (**self).work()
    }
}

/// Typed handle of one runtime, recoverable from an envelope.
pub trait Bridged: Into<Work> + Clone + Send + Sync + 'static {
    /// Kind tag of this handle type.
    const KIND: WorkKind;

    /// Extracts the handle, failing with [`BridgeError::KindMismatch`] for other kinds.
    fn from_work(work: Work) -> Result<Self, BridgeError>;
}

impl Bridged for Operation {
    const KIND: WorkKind = WorkKind::Operation;

    fn from_work(work: Work) -> Result<Self, BridgeError> {
        match work.into_handle() {
            Handle::Operation(op) => Ok(op),
            other => Err(BridgeError::KindMismatch {
                expected: Self::KIND,
                found: other.kind(),
            }),
        }
    }
}
