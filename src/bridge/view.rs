//! Typed, target-fixed registry view.

use std::fmt;
use std::marker::PhantomData;

use crate::bridge::Registry;
use crate::error::BridgeError;
use crate::platforms::{Bridged, Work, WorkKind};

/// Converts any envelope to the handle type `T`.
///
/// Obtained from [`Registry::target`].
pub struct Target<T> {
    pub(super) registry: Registry,
    pub(super) _marker: PhantomData<fn() -> T>,
}

impl<T: Bridged> Target<T> {
    /// Kind every conversion through this view produces.
    pub fn kind(&self) -> WorkKind {
        T::KIND
    }

    /// Converts `work` and unwraps the resulting handle.
    pub fn convert(&self, work: Work) -> Result<T, BridgeError> {
        let converted = self.registry.convert(work, T::KIND)?;
        T::from_work(converted)
    }

    /// Converts `work`, keeping the envelope.
    pub fn convert_work(&self, work: Work) -> Result<Work, BridgeError> {
        self.registry.convert(work, T::KIND)
    }

    /// Registry behind this view.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Bridged> fmt::Debug for Target<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target").field("kind", &T::KIND).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Operation, OperationPlatform, Platform, TaskHandle};

    /// Claims the task kind but hands back canonical envelopes.
    struct Misbehaving;

    impl Platform for Misbehaving {
        fn kind(&self) -> WorkKind {
            WorkKind::Task
        }

        fn forward(&self, operation: Operation) -> Result<Work, BridgeError> {
            OperationPlatform.forward(operation)
        }

        fn backward(&self, work: Work) -> Result<Operation, BridgeError> {
            OperationPlatform.backward(work)
        }
    }

    #[test]
    fn wrong_output_kind_is_a_mismatch() {
        let registry = Registry::builder().platform(Misbehaving).build();
        let target = registry.target::<TaskHandle>();
        assert_eq!(target.kind(), WorkKind::Task);

        let err = target.convert(Operation::new().into()).unwrap_err();
        assert_eq!(
            err,
            BridgeError::KindMismatch {
                expected: WorkKind::Task,
                found: WorkKind::Operation,
            }
        );
    }

    #[test]
    fn hub_view_is_identity() {
        let registry = Registry::builder().build();
        let op = Operation::new();
        let back = registry.target::<Operation>().convert(op.clone().into()).unwrap();
        assert!(back.ptr_eq(&op));
    }
}
