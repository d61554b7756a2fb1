//! Registration entries and the tokens that undo them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::container::{Container, ContainerInner};
use crate::context::Context;
use crate::contract::ContractType;
use crate::dependency::Dependency;
use crate::dispose::Disposable;
use crate::error::Error;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::resolve_guard::ResolveGuard;
use crate::resolver::Resolver;
use crate::runtime::{Gate, Shared, WeakShared, next_id};

/// One row of a registration table, shared by all of its keys.
///
/// The lifetime given at registration is a template. Open generic
/// registrations clone it once per closed type argument list, so
/// `Repo<i32>` and `Repo<String>` never share a singleton.
pub(crate) struct RegistrationEntry {
    id: u64,
    keys: Vec<Key>,
    dependency: Dependency,
    lifetime: Option<Shared<dyn Lifetime>>,
    generic_lifetimes: Gate<HashMap<Vec<ContractType>, Shared<dyn Lifetime>>>,
    disposed: AtomicBool,
}

impl RegistrationEntry {
    pub(crate) fn new(
        keys: Vec<Key>,
        dependency: Dependency,
        lifetime: Option<Shared<dyn Lifetime>>,
    ) -> Self {
        Self {
            id: next_id(),
            keys,
            dependency,
            lifetime,
            generic_lifetimes: Gate::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn is_generic(&self) -> bool {
        self.keys.iter().any(|key| key.contract().is_open_generic())
    }

    fn lifetime_for(&self, key: &Key) -> Option<Shared<dyn Lifetime>> {
        let template = self.lifetime.as_ref()?;
        match key.contract().closed() {
            Some(closed) if self.is_generic() => Some(
                self.generic_lifetimes
                    .lock()
                    .entry(closed.arguments.clone())
                    .or_insert_with(|| template.fresh())
                    .clone(),
            ),
            _ => Some(template.clone()),
        }
    }

    /// Compiles a resolver serving `key` for the `requesting` container.
    pub(crate) fn create_resolver(&self, key: &Key, requesting: &Container) -> Result<Resolver, Error> {
        let _guard = ResolveGuard::enter(requesting.id(), &format!("{}::{}", requesting.name(), key))?;

        #[cfg(feature = "tracing")]
        debug!("Compiling resolver for {} in {}", key, requesting.name());

        let base = self.dependency.compile(key, requesting)?;
        let resolver = match self.lifetime_for(key) {
            None => Resolver::new(key.clone(), move |ctx: &Context<'_>| base(ctx)),
            Some(lifetime) => Resolver::new(key.clone(), move |ctx: &Context<'_>| {
                lifetime.get_or_create(ctx, &*base)
            }),
        };
        Ok(resolver)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Disposes the lifetime template and every per-type clone, once.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(lifetime) = &self.lifetime {
            lifetime.dispose();
        }
        let clones: Vec<Shared<dyn Lifetime>> = self
            .generic_lifetimes
            .lock()
            .drain()
            .map(|(_, lifetime)| lifetime)
            .collect();
        for lifetime in clones {
            lifetime.dispose();
        }
    }
}

impl fmt::Debug for RegistrationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationEntry")
            .field("id", &self.id)
            .field("keys", &self.keys)
            .field("dependency", &self.dependency)
            .field("lifetime", &self.lifetime.as_ref().map(|l| l.name()))
            .finish()
    }
}

/// Returned by a successful registration. Disposing it removes exactly the
/// keys it added and disposes what the registration owns.
pub struct RegistrationToken {
    container: WeakShared<ContainerInner>,
    entry: Shared<RegistrationEntry>,
}

impl RegistrationToken {
    pub(crate) fn new(container: WeakShared<ContainerInner>, entry: Shared<RegistrationEntry>) -> Self {
        Self { container, entry }
    }

    pub fn keys(&self) -> &[Key] {
        self.entry.keys()
    }

    pub fn is_disposed(&self) -> bool {
        self.entry.is_disposed()
    }
}

impl Disposable for RegistrationToken {
    fn dispose(&self) {
        if let Some(container) = Container::upgrade(&self.container) {
            container.unregister(&self.entry);
        }
        self.entry.dispose();
    }
}

impl fmt::Debug for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationToken")
            .field("keys", &self.entry.keys())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{GenericDefinition, GenericInterface, GenericParameter};
    use crate::lifetime::{IntoLifetime, Lifetimes};

    trait Repo<T>: Send + Sync {}

    const REPO: GenericDefinition = GenericDefinition {
        name: "registration::tests::Repo",
        parameters: &[GenericParameter {
            name: "T",
            constraints: &[],
        }],
    };

    impl<T: 'static> GenericInterface for dyn Repo<T> {
        fn definition() -> GenericDefinition {
            REPO
        }

        fn arguments() -> Vec<ContractType> {
            vec![ContractType::of::<T>()]
        }
    }

    fn entry(keys: Vec<Key>, lifetime: Lifetimes) -> RegistrationEntry {
        RegistrationEntry::new(keys, Dependency::constant(1u8), lifetime.into_lifetime())
    }

    #[test]
    fn generic_entries_clone_lifetime_per_arguments() {
        let entry = entry(vec![Key::open(REPO)], Lifetimes::Singleton);
        let int_key = Key::generic::<Shared<dyn Repo<i32>>>();
        let text_key = Key::generic::<Shared<dyn Repo<String>>>();

        let a = entry.lifetime_for(&int_key).unwrap();
        let b = entry.lifetime_for(&int_key).unwrap();
        let c = entry.lifetime_for(&text_key).unwrap();
        assert!(Shared::ptr_eq(&a, &b));
        assert!(!Shared::ptr_eq(&a, &c));
    }

    #[test]
    fn plain_entries_share_the_template() {
        let entry = entry(vec![Key::of::<u8>(), Key::tagged::<u8>(1)], Lifetimes::Singleton);
        let a = entry.lifetime_for(&Key::of::<u8>()).unwrap();
        let b = entry.lifetime_for(&Key::tagged::<u8>(1)).unwrap();
        assert!(Shared::ptr_eq(&a, &b));
    }

    #[test]
    fn transient_entries_have_no_lifetime() {
        let entry = entry(vec![Key::of::<u8>()], Lifetimes::Transient);
        assert!(entry.lifetime_for(&Key::of::<u8>()).is_none());
    }

    #[test]
    fn dispose_is_idempotent() {
        let entry = entry(vec![Key::of::<u8>()], Lifetimes::Singleton);
        assert!(!entry.is_disposed());
        entry.dispose();
        entry.dispose();
        assert!(entry.is_disposed());
    }

    #[test]
    fn resolver_serves_requested_key() {
        let container = Container::empty();
        let entry = entry(vec![Key::of::<u8>()], Lifetimes::Transient);
        let resolver = entry.create_resolver(&Key::of::<u8>(), &container).unwrap();
        assert_eq!(resolver.key(), &Key::of::<u8>());
        assert_eq!(resolver.get::<u8>(&container, &[]).unwrap(), 1);
    }
}
