//! Compiled resolvers and the per-container resolver cache.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::container::Container;
use crate::context::{Context, ResolveScope};
use crate::contract::ContractType;
use crate::error::Error;
use crate::instance::Instance;
use crate::key::Key;
use crate::resolve_guard::ResolveGuard;
use crate::runtime::Shared;

/// The executable body of a resolver.
pub type ResolveFn = dyn Fn(&Context<'_>) -> Result<Instance, Error> + Send + Sync;

/// A directly callable function producing an instance for one key, given a
/// container and positional arguments.
#[derive(Clone)]
pub struct Resolver {
    key: Key,
    inner: Shared<ResolveFn>,
}

impl Resolver {
    pub fn new<F>(key: Key, resolve: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<Instance, Error> + Send + Sync + 'static,
    {
        Self {
            key,
            inner: Shared::new(resolve),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Runs the resolver as a top-level call with a fresh resolve scope.
    pub fn resolve(&self, container: &Container, args: &[Instance]) -> Result<Instance, Error> {
        let scope = Shared::new(ResolveScope::new());
        self.resolve_in(container, args, &scope)
    }

    /// Runs the resolver inside an existing resolve scope.
    pub fn resolve_in(
        &self,
        container: &Container,
        args: &[Instance],
        scope: &Shared<ResolveScope>,
    ) -> Result<Instance, Error> {
        let _guard = ResolveGuard::enter(container.id(), &format!("{}::{}", container.name(), self.key))?;
        let ctx = Context::new(container, &self.key, args, scope);
        (self.inner)(&ctx)
    }

    pub fn get<T: Any + Clone>(&self, container: &Container, args: &[Instance]) -> Result<T, Error> {
        self.resolve(container, args)?.downcast::<T>()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("key", &self.key).finish()
    }
}

/// Immutable snapshot of compiled resolvers.
///
/// Untagged requests are served from `by_type`, tagged ones from `by_key`.
/// Snapshots are replaced wholesale, never patched in place.
///
/// A plain contract and the closed generic of the same Rust type are equal
/// keys, but only the closed one can fall back to an open definition, so
/// each form gets its own slot.
#[derive(Clone, Default)]
pub(crate) struct ResolverCache {
    by_key: HashMap<(bool, Key), Resolver>,
    by_type: HashMap<(bool, ContractType), Resolver>,
}

impl ResolverCache {
    pub(crate) fn get(&self, key: &Key) -> Option<Resolver> {
        let closed = key.contract().is_closed_generic();
        match key.tag() {
            None => self.by_type.get(&(closed, key.contract().clone())).cloned(),
            Some(_) => self.by_key.get(&(closed, key.clone())).cloned(),
        }
    }

    pub(crate) fn with(&self, key: &Key, resolver: Resolver) -> Self {
        let closed = key.contract().is_closed_generic();
        let mut next = self.clone();
        match key.tag() {
            None => {
                next.by_type.insert((closed, key.contract().clone()), resolver);
            }
            Some(_) => {
                next.by_key.insert((closed, key.clone()), resolver);
            }
        }
        next
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len() + self.by_type.len()
    }
}
