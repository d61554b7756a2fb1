//! Thread-local stack guard for circular dependency detection.
//!
//! This module provides [`ResolveGuard`], a utility for tracking the chain of
//! bindings being compiled or resolved on the current thread. The container
//! passes its id with every entry, so the same key requested through two
//! different containers is not mistaken for a cycle, even when both carry
//! the same name.
//!
//! # Example
//! ```
//! use ioc::{ErrorKind, ResolveGuard};
//!
//! let _g1 = ResolveGuard::push("root::A").unwrap();
//! let _g2 = ResolveGuard::push("root::B").unwrap();
//! let err = ResolveGuard::push("root::A").unwrap_err();
//! assert!(matches!(err.kind, ErrorKind::CircularDependency));
//! ```

use std::cell::RefCell;

use crate::error::Error;

thread_local! {
    static RESOLVE_STACK: RefCell<Vec<(u64, String)>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the last pushed entry from the thread-local stack on drop.
#[derive(Debug)]
pub struct ResolveGuard {
    pub entry: String,
}

impl ResolveGuard {
    /// Try to push an entry onto the thread-local stack.
    ///
    /// Returns `Err(Error::circular_dependency(..))` with the whole chain if the
    /// entry is already on the stack. Otherwise, returns a guard that pops the
    /// entry on drop.
    pub fn push(entry: &str) -> Result<Self, Error> {
        Self::enter(0, entry)
    }

    /// Like [`ResolveGuard::push`], with `entry` scoped to `owner`. Only an
    /// equal entry under the same owner is a cycle.
    pub fn enter(owner: u64, entry: &str) -> Result<Self, Error> {
        RESOLVE_STACK.with(|stack| {
            let mut v = stack.borrow_mut();
            if v.iter().any(|(o, s)| *o == owner && s == entry) {
                let mut chain: Vec<&str> = v.iter().map(|(_, s)| s.as_str()).collect();
                chain.push(entry);
                return Err(Error::circular_dependency(&chain));
            }
            v.push((owner, entry.to_string()));
            Ok(ResolveGuard {
                entry: entry.to_string(),
            })
        })
    }

    /// Number of entries currently on this thread's stack.
    pub fn depth() -> usize {
        RESOLVE_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn push_and_pop_stack() {
        {
            let _g1 = ResolveGuard::push("root::A").unwrap();
            {
                let _g2 = ResolveGuard::push("root::B").unwrap();
                let err = ResolveGuard::push("root::A").unwrap_err();
                assert!(matches!(err.kind, ErrorKind::CircularDependency));
                assert!(err.message.contains("root::A -> root::B -> root::A"));
            }
            // B popped, only A remains
            assert!(ResolveGuard::push("root::A").is_err());
            assert_eq!(ResolveGuard::depth(), 1);
        }
        let _g = ResolveGuard::push("root::A").unwrap();
    }

    #[test]
    fn same_key_in_other_container_is_not_a_cycle() {
        let _g1 = ResolveGuard::push("root::A").unwrap();
        let _g2 = ResolveGuard::push("root/child::A").unwrap();
        assert_eq!(ResolveGuard::depth(), 2);
    }

    #[test]
    fn equal_names_under_other_owners_are_not_a_cycle() {
        let _g1 = ResolveGuard::enter(7, "root/worker::u32").unwrap();
        let _g2 = ResolveGuard::enter(8, "root/worker::u32").unwrap();
        let err = ResolveGuard::enter(7, "root/worker::u32").unwrap_err();
        assert!(err.message.contains("root/worker::u32 -> root/worker::u32 -> root/worker::u32"));
    }

    #[test]
    fn stacks_are_per_thread() {
        let _g = ResolveGuard::push("root::A").unwrap();
        let other = std::thread::spawn(|| ResolveGuard::push("root::A").is_ok())
            .join()
            .unwrap();
        assert!(other);
    }
}
