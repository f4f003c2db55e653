//! Type-erased completion payload.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Value an operation completed with.
///
/// Operations of every runtime share one state machine, so the payload is erased;
/// callers that know the concrete type recover it with [`Output::downcast_ref`].
#[derive(Clone, Default)]
pub struct Output(Option<Arc<dyn Any + Send + Sync>>);

impl Output {
    /// Output carrying no value.
    pub fn unit() -> Self {
        Self(None)
    }

    /// Output carrying `value`.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Some(Arc::new(value)))
    }

    /// True if no value is attached.
    pub fn is_unit(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the value as `T`, if it has that type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl From<()> for Output {
    fn from(_: ()) -> Self {
        Output::unit()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("Output(())"),
            Some(_) => f.write_str("Output(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_recovers_the_value() {
        let out = Output::new(String::from("done"));
        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("done"));
        assert!(out.downcast_ref::<u8>().is_none());
        assert!(!out.is_unit());
    }

    #[test]
    fn unit_has_no_value() {
        let out = Output::from(());
        assert!(out.is_unit());
        assert!(out.downcast_ref::<()>().is_none());
        assert_eq!(format!("{out:?}"), "Output(())");
    }
}
