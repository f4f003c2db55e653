//! # Active set: the workers a supervisor currently tracks.
//!
//! Maps each accepted [`WorkId`] to the worker's submitted kind and its canonical
//! [`Operation`]. One `parking_lot` mutex guards the map; every abort happens after the
//! lock is released, so operation hooks never run under it.
//!
//! ## Rules
//! - An id is tracked at most once; a second `track` is refused.
//! - After [`ActiveSet::close`], nothing can be tracked again.
//! - Removal by pruning only succeeds for the exact operation that was tracked.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::operation::Operation;
use crate::platforms::{WorkId, WorkKind};

/// Why a worker could not be tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    /// Already tracked under this id.
    Duplicate,
    /// The set was closed.
    Closed,
}

impl Refusal {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            Refusal::Duplicate => "worker_already_tracked",
            Refusal::Closed => "supervisor_concluded",
        }
    }
}

struct Tracked {
    kind: WorkKind,
    operation: Operation,
}

#[derive(Default)]
struct Entries {
    closed: bool,
    map: HashMap<WorkId, Tracked>,
}

/// Tracked workers of one supervisor.
#[derive(Default)]
pub(crate) struct ActiveSet {
    entries: Mutex<Entries>,
}

impl ActiveSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `operation` under `id`.
    pub(crate) fn track(&self, id: WorkId, kind: WorkKind, operation: &Operation) -> Result<(), Refusal> {
        let mut entries = self.entries.lock();
        if entries.closed {
            return Err(Refusal::Closed);
        }
        if entries.map.contains_key(&id) {
            return Err(Refusal::Duplicate);
        }
        entries.map.insert(
            id,
            Tracked {
                kind,
                operation: operation.clone(),
            },
        );
        Ok(())
    }

    /// True if `id` is tracked with exactly `operation`.
    pub(crate) fn is_tracking(&self, id: WorkId, operation: &Operation) -> bool {
        self.entries
            .lock()
            .map
            .get(&id)
            .is_some_and(|t| t.operation.ptr_eq(operation))
    }

    /// Removes and aborts `id`; returns its kind if it was tracked.
    pub(crate) fn release(&self, id: WorkId) -> Option<WorkKind> {
        let removed = self.entries.lock().map.remove(&id)?;
        abort(id, &removed.operation);
        Some(removed.kind)
    }

    /// Removes and aborts every entry; returns what was removed.
    pub(crate) fn release_all(&self) -> Vec<(WorkId, WorkKind)> {
        let drained: Vec<(WorkId, Tracked)> = self.entries.lock().map.drain().collect();
        abort_all(drained)
    }

    /// Refuses later insertions, then removes and aborts every entry.
    pub(crate) fn close(&self) -> Vec<(WorkId, WorkKind)> {
        let drained: Vec<(WorkId, Tracked)> = {
            let mut entries = self.entries.lock();
            entries.closed = true;
            entries.map.drain().collect()
        };
        abort_all(drained)
    }

    /// Removes `id` without aborting, if it still maps to `operation`.
    pub(crate) fn forget_concluded(&self, id: WorkId, operation: &Operation) -> Option<WorkKind> {
        let mut entries = self.entries.lock();
        let tracked = entries.map.get(&id)?;
        if !tracked.operation.ptr_eq(operation) {
            return None;
        }
        entries.map.remove(&id).map(|t| t.kind)
    }

    pub(crate) fn contains(&self, id: WorkId) -> bool {
        self.entries.lock().map.contains_key(&id)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.entries.lock().closed
    }

    /// Tracked ids, sorted.
    pub(crate) fn ids(&self) -> Vec<WorkId> {
        let mut ids: Vec<WorkId> = self.entries.lock().map.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map.len()
    }
}

fn abort(id: WorkId, operation: &Operation) {
    if let Err(err) = operation.abort() {
        trace!(worker = %id, %err, "worker already concluded");
    }
}

fn abort_all(drained: Vec<(WorkId, Tracked)>) -> Vec<(WorkId, WorkKind)> {
    drained
        .into_iter()
        .map(|(id, tracked)| {
            abort(id, &tracked.operation);
            (id, tracked.kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::Work;

    fn running() -> (WorkId, Operation) {
        let op = Operation::new();
        op.start().unwrap();
        (Work::from(op.clone()).id(), op)
    }

    #[test]
    fn duplicates_are_refused() {
        let set = ActiveSet::new();
        let (id, op) = running();
        assert_eq!(set.track(id, WorkKind::Operation, &op), Ok(()));
        assert_eq!(set.track(id, WorkKind::Operation, &op), Err(Refusal::Duplicate));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn release_aborts_and_forgets() {
        let set = ActiveSet::new();
        let (id, op) = running();
        set.track(id, WorkKind::Task, &op).unwrap();

        assert_eq!(set.release(id), Some(WorkKind::Task));
        assert!(op.try_conclusion().is_some_and(|c| c.is_aborted()));
        assert_eq!(set.release(id), None);
    }

    #[test]
    fn close_aborts_everything_and_refuses_more() {
        let set = ActiveSet::new();
        let (a, op_a) = running();
        let (b, op_b) = running();
        set.track(a, WorkKind::Operation, &op_a).unwrap();
        set.track(b, WorkKind::Operation, &op_b).unwrap();

        let mut closed: Vec<WorkId> = set.close().into_iter().map(|(id, _)| id).collect();
        closed.sort_unstable();
        assert_eq!(closed, {
            let mut ids = vec![a, b];
            ids.sort_unstable();
            ids
        });
        assert!(op_a.try_conclusion().is_some_and(|c| c.is_aborted()));
        assert!(op_b.try_conclusion().is_some_and(|c| c.is_aborted()));

        let (c, op_c) = running();
        assert_eq!(set.track(c, WorkKind::Operation, &op_c), Err(Refusal::Closed));
        assert!(set.is_closed());
    }

    #[test]
    fn forget_concluded_checks_the_operation() {
        let set = ActiveSet::new();
        let (id, op) = running();
        set.track(id, WorkKind::Operation, &op).unwrap();

        let stranger = Operation::new();
        assert_eq!(set.forget_concluded(id, &stranger), None);
        assert!(set.is_tracking(id, &op));

        op.complete(crate::Output::unit()).unwrap();
        assert_eq!(set.forget_concluded(id, &op), Some(WorkKind::Operation));
        assert!(set.ids().is_empty());
    }

    #[test]
    fn release_all_tolerates_concluded_entries() {
        let set = ActiveSet::new();
        let (id, op) = running();
        set.track(id, WorkKind::Operation, &op).unwrap();
        op.complete(crate::Output::unit()).unwrap();

        assert_eq!(set.release_all(), vec![(id, WorkKind::Operation)]);
        assert!(op.try_conclusion().is_some_and(|c| c.is_completed()));
        assert_eq!(set.len(), 0);
    }
}
