//! Disposal contract for instances, registrations, subscriptions and
//! containers.

use crate::runtime::{Gate, Shared};

/// Releases resources held by a value.
///
/// Implementations must tolerate repeated calls; the container never calls
/// `dispose` twice on what it owns, but user code might.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

impl<T: Disposable + ?Sized> Disposable for Shared<T> {
    fn dispose(&self) {
        (**self).dispose()
    }
}

impl<T: Disposable + ?Sized> Disposable for Box<T> {
    fn dispose(&self) {
        (**self).dispose()
    }
}

/// Runs a closure the first time it is disposed.
pub struct OnDispose {
    action: Gate<Option<Box<dyn FnOnce() + Send>>>,
}

impl OnDispose {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Gate::new(Some(Box::new(action))),
        }
    }
}

impl Disposable for OnDispose {
    fn dispose(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }
}
