//! Injection context handed to factories and lifetimes.

use std::any::Any;
use std::collections::HashMap;

use crate::container::Container;
use crate::contract::GenericContract;
use crate::error::Error;
use crate::instance::Instance;
use crate::key::{Key, Tag};
use crate::runtime::{Gate, Shared, next_id};

/// State shared by every resolution made during one top-level resolve call.
///
/// Resolve-singleton lifetimes cache their instance here, so the same binding
/// requested twice within one object graph yields the same instance.
pub struct ResolveScope {
    id: u64,
    instances: Gate<HashMap<u64, Instance>>,
}

impl ResolveScope {
    pub fn new() -> Self {
        Self {
            id: next_id(),
            instances: Gate::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get(&self, slot: u64) -> Option<Instance> {
        self.instances.lock().get(&slot).cloned()
    }

    /// Stores `instance` unless the slot was filled meanwhile, and returns
    /// whatever the slot holds afterwards.
    pub fn insert_or_get(&self, slot: u64, instance: Instance) -> Instance {
        self.instances.lock().entry(slot).or_insert(instance).clone()
    }
}

impl Default for ResolveScope {
    fn default() -> Self {
        Self::new()
    }
}

/// What a resolver knows while it runs: the resolving container, the
/// requested key, the positional arguments and the resolve scope.
pub struct Context<'a> {
    container: &'a Container,
    key: &'a Key,
    args: &'a [Instance],
    scope: &'a Shared<ResolveScope>,
}

impl<'a> Context<'a> {
    pub fn new(
        container: &'a Container,
        key: &'a Key,
        args: &'a [Instance],
        scope: &'a Shared<ResolveScope>,
    ) -> Self {
        Self {
            container,
            key,
            args,
            scope,
        }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn key(&self) -> &'a Key {
        self.key
    }

    pub fn args(&self) -> &'a [Instance] {
        self.args
    }

    pub fn scope(&self) -> &'a Shared<ResolveScope> {
        self.scope
    }

    /// Positional argument `index` as `T`.
    pub fn arg<T: Any + Clone>(&self, index: usize) -> Result<T, Error> {
        self.args
            .get(index)
            .ok_or_else(|| Error::missing_argument(index, std::any::type_name::<T>()))?
            .downcast::<T>()
    }

    pub fn inject<T: Any + Clone>(&self) -> Result<T, Error> {
        self.inject_key(&Key::of::<T>())?.downcast::<T>()
    }

    pub fn inject_tagged<T: Any + Clone>(&self, tag: impl Into<Tag>) -> Result<T, Error> {
        self.inject_key(&Key::tagged::<T>(tag))?.downcast::<T>()
    }

    pub fn inject_generic<G: GenericContract + Clone>(&self) -> Result<G, Error> {
        self.inject_key(&Key::generic::<G>())?.downcast::<G>()
    }

    /// Resolves `key` from the same container, within the same resolve scope.
    pub fn inject_key(&self, key: &Key) -> Result<Instance, Error> {
        self.inject_with(key, &[])
    }

    pub fn inject_with(&self, key: &Key, args: &[Instance]) -> Result<Instance, Error> {
        self.container
            .get_resolver(key)?
            .resolve_in(self.container, args, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_keeps_first_instance() {
        let scope = ResolveScope::new();
        assert!(scope.get(1).is_none());

        let first = scope.insert_or_get(1, Instance::new(1u8));
        let second = scope.insert_or_get(1, Instance::new(2u8));
        assert!(first.ptr_eq(&second));
        assert_eq!(scope.get(1).unwrap().downcast::<u8>().unwrap(), 1);
    }

    #[test]
    fn scopes_have_distinct_ids() {
        assert_ne!(ResolveScope::new().id(), ResolveScope::new().id());
    }

    #[test]
    fn arguments_are_read_by_position() {
        let container = Container::empty();
        let key = Key::of::<u8>();
        let args = [Instance::new(5i32), Instance::new(String::from("x"))];
        let scope = Shared::new(ResolveScope::new());
        let ctx = Context::new(&container, &key, &args, &scope);

        assert_eq!(ctx.arg::<i32>(0).unwrap(), 5);
        assert_eq!(ctx.arg::<String>(1).unwrap(), "x");
        assert_eq!(
            ctx.arg::<i32>(2).unwrap_err().kind,
            crate::error::ErrorKind::MissingArgument
        );
        assert_eq!(
            ctx.arg::<u64>(0).unwrap_err().kind,
            crate::error::ErrorKind::TypeMismatch
        );
    }
}
