//! Type-erased values flowing through resolvers and lifetimes.

use std::any::Any;
use std::fmt;

use crate::dispose::Disposable;
use crate::error::Error;
use crate::runtime::Shared;

/// A resolved value together with its optional disposal view.
///
/// Cloning an `Instance` is cheap and never clones the underlying value.
#[derive(Clone)]
pub struct Instance {
    value: Shared<dyn Any + Send + Sync>,
    disposer: Option<Shared<dyn Disposable>>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Shared::new(value),
            disposer: None,
        }
    }

    /// Wraps a value that is disposed together with its owning scope.
    pub fn disposable<T>(value: T) -> Self
    where
        T: Disposable + Any + Clone,
    {
        Self {
            disposer: Some(Shared::new(value.clone())),
            value: Shared::new(value),
        }
    }

    pub fn with_disposer(self, disposer: Shared<dyn Disposable>) -> Self {
        Self {
            value: self.value,
            disposer: Some(disposer),
        }
    }

    /// Clones the value out as `T`.
    pub fn downcast<T: Any + Clone>(&self) -> Result<T, Error> {
        self.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| Error::type_mismatch(std::any::type_name::<T>()))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    pub fn dispose(&self) {
        if let Some(disposer) = &self.disposer {
            disposer.dispose();
        }
    }

    /// Whether both instances wrap the same allocation.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Shared::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Connection {
        closed: AtomicUsize,
    }

    impl Disposable for Connection {
        fn dispose(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn downcast_clones_value() {
        let instance = Instance::new(String::from("hello"));
        assert_eq!(instance.downcast::<String>().unwrap(), "hello");
        assert!(instance.is::<String>());
        assert!(!instance.is_disposable());
    }

    #[test]
    fn downcast_to_wrong_type_fails() {
        let instance = Instance::new(42u32);
        let err = instance.downcast::<String>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn disposable_instance_disposes_shared_value() {
        let connection = Shared::new(Connection {
            closed: AtomicUsize::new(0),
        });
        let instance = Instance::disposable(connection.clone());
        assert!(instance.is_disposable());

        instance.dispose();
        assert_eq!(connection.closed.load(Ordering::SeqCst), 1);

        let resolved = instance.downcast::<Shared<Connection>>().unwrap();
        assert!(Shared::ptr_eq(&resolved, &connection));
    }

    #[test]
    fn clones_share_the_value() {
        let instance = Instance::new(1u8);
        let clone = instance.clone();
        assert!(instance.ptr_eq(&clone));
        assert!(!instance.ptr_eq(&Instance::new(1u8)));
    }
}
