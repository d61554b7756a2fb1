//! Runtime type definitions for shared ownership and interior mutability.
//!
//! The container is always shared across threads, so every alias here is
//! backed by a thread-safe primitive:
//!
//! - [`Shared<T>`]: reference-counted handle ([`std::sync::Arc`])
//! - [`WeakShared<T>`]: non-owning handle used to break parent/child cycles
//! - [`Store<T>`]: read-mostly state guarded by a [`parking_lot::RwLock`]
//! - [`Gate<T>`]: exclusive state guarded by a [`parking_lot::Mutex`]
//!
//! `parking_lot` locks never poison, which keeps lock acquisition free of
//! `unwrap()` calls throughout the crate.
//!
//! # Examples
//!
//! ```
//! use ioc::runtime::{Shared, Store};
//!
//! let store = Shared::new(Store::new(42));
//! *store.write() += 1;
//! assert_eq!(*store.read(), 43);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared ownership of container state, instances and collaborators.
pub type Shared<T> = std::sync::Arc<T>;

/// Weak counterpart of [`Shared`].
pub type WeakShared<T> = std::sync::Weak<T>;

/// Read-write lock used for state that is read far more often than written.
pub type Store<T> = parking_lot::RwLock<T>;

/// Mutex used for state that is always mutated under exclusive access.
pub type Gate<T> = parking_lot::Mutex<T>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique identifier.
///
/// Containers, registrations, lifetimes, resolve scopes and resources all draw
/// from the same sequence, so ids never collide across kinds.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_can_be_cloned() {
        let data = Shared::new(100);
        let clone = Shared::clone(&data);
        assert_eq!(Shared::strong_count(&data), 2);

        drop(clone);
        assert_eq!(Shared::strong_count(&data), 1);
    }

    #[test]
    fn test_store_allows_mutation() {
        let store = Store::new(42);
        {
            let value = store.read();
            assert_eq!(*value, 42);
        }
        {
            let mut value = store.write();
            *value = 100;
        }
        assert_eq!(*store.read(), 100);
    }

    #[test]
    fn test_gate_allows_mutation() {
        let gate = Gate::new(String::from("Hello"));
        gate.lock().push_str(", World!");
        assert_eq!(*gate.lock(), "Hello, World!");
    }

    #[test]
    fn test_weak_shared_does_not_keep_value_alive() {
        let data = Shared::new(7);
        let weak: WeakShared<i32> = Shared::downgrade(&data);
        assert_eq!(weak.upgrade().map(|v| *v), Some(7));

        drop(data);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let first = next_id();
        let second = next_id();
        assert_ne!(first, second);
        assert!(second > first);
    }
}
