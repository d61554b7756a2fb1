//! The container: registration tables, resolver cache and hierarchy.
//!
//! A [`Container`] is a cheap, cloneable handle. Children keep their parent
//! alive and delegate lookups to it; parents only keep weak handles to their
//! children, for cascading disposal.
//!
//! ```
//! use ioc::{Container, Dependency, Key, Lifetimes, Shared};
//!
//! struct Config {
//!     url: String,
//! }
//!
//! let root = Container::new();
//! root.register(
//!     [Key::of::<Shared<Config>>()],
//!     Dependency::factory(|_| Ok(Shared::new(Config { url: String::from("db://main") }))),
//!     Lifetimes::Singleton,
//! )
//! .unwrap();
//!
//! let child = root.create_child("request").unwrap();
//! let a = root.resolve::<Shared<Config>>().unwrap();
//! let b = child.resolve::<Shared<Config>>().unwrap();
//! assert!(Shared::ptr_eq(&a, &b));
//! assert_eq!(child.name(), "root/request");
//! ```

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

use arc_swap::ArcSwap;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::autowiring::{AutowiringStrategy, DefaultAutowiringStrategy};
use crate::configuration::Configuration;
use crate::contract::{ContractType, GenericContract};
use crate::dependency::Dependency;
use crate::dispose::Disposable;
use crate::error::Error;
use crate::events::{ContainerEvent, EventKind, Subject, Subscription};
use crate::features;
use crate::instance::Instance;
use crate::issues::{DefaultIssueResolver, IssueResolver};
use crate::key::{Key, Tag};
use crate::lifetime::IntoLifetime;
use crate::registration::{RegistrationEntry, RegistrationToken};
use crate::resolver::{Resolver, ResolverCache};
use crate::runtime::{Gate, Shared, WeakShared, next_id};

const ROOT: &str = "root";

#[derive(Clone)]
pub struct Container {
    inner: Shared<ContainerInner>,
}

pub(crate) struct ContainerInner {
    id: u64,
    name: String,
    parent: Option<Container>,
    state: Gate<State>,
    resolvers: ArcSwap<ResolverCache>,
    events: Shared<Subject>,
}

enum Resource {
    Owned(Box<dyn Disposable>),
    Child(WeakShared<ContainerInner>),
}

#[derive(Default)]
struct State {
    registrations: HashMap<Key, Shared<RegistrationEntry>>,
    any_tag: HashMap<ContractType, Shared<RegistrationEntry>>,
    entries: Vec<Shared<RegistrationEntry>>,
    resources: Vec<(u64, Resource)>,
    configured: HashSet<TypeId>,
    generation: u64,
    children: u64,
    disposed: bool,
    parent_resource: Option<u64>,
    parent_subscription: Option<Subscription>,
}

impl State {
    fn is_bound(&self, key: &Key) -> bool {
        match key.is_any_tag() {
            true => self.any_tag.contains_key(key.contract()),
            false => self.registrations.contains_key(key),
        }
    }

    /// Exact key, then the generic definition with the same tag, then the
    /// generic definition under any tag, then the exact type under any tag.
    fn find(&self, key: &Key) -> Option<Shared<RegistrationEntry>> {
        if key.is_any_tag() {
            return self.any_tag.get(key.contract()).cloned();
        }
        if let Some(entry) = self.registrations.get(key) {
            return Some(entry.clone());
        }
        if let Some(definition) = key.contract().closed().map(|closed| closed.definition) {
            let open = ContractType::definition(definition);
            let tagged = Key::new(open.clone(), key.tag().cloned());
            if let Some(entry) = self.registrations.get(&tagged) {
                return Some(entry.clone());
            }
            if let Some(entry) = self.any_tag.get(&open) {
                return Some(entry.clone());
            }
        }
        self.any_tag.get(key.contract()).cloned()
    }
}

impl ContainerInner {
    /// Drops the resolvers of this container and of every live descendant.
    ///
    /// Runs with `state` locked, so no container below can publish a
    /// resolver compiled against the old table. Locks are taken parent
    /// first. Upgraded children are handed back to be released once the
    /// caller has unlocked, since dropping the last handle disposes a child
    /// and that reaches back into its parent.
    fn reset(&self, state: &mut State) -> Vec<Shared<ContainerInner>> {
        let mut alive = Vec::new();
        self.reset_into(state, &mut alive);
        alive
    }

    fn reset_into(&self, state: &mut State, alive: &mut Vec<Shared<ContainerInner>>) {
        state.generation += 1;
        self.resolvers.store(Shared::new(ResolverCache::default()));
        for (_, resource) in &state.resources {
            let Resource::Child(child) = resource else {
                continue;
            };
            if let Some(child) = child.upgrade() {
                {
                    let mut child_state = child.state.lock();
                    child.reset_into(&mut child_state, alive);
                }
                alive.push(child);
            }
        }
    }

    fn add_resource(&self, resource: Resource) -> Option<u64> {
        let id = next_id();
        let mut state = self.state.lock();
        if state.disposed {
            return None;
        }
        state.resources.push((id, resource));
        Some(id)
    }

    fn dispose(&self) {
        let (entries, resources, subscription, parent_resource) = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.generation += 1;
            state.registrations.clear();
            state.any_tag.clear();
            (
                std::mem::take(&mut state.entries),
                std::mem::take(&mut state.resources),
                state.parent_subscription.take(),
                state.parent_resource.take(),
            )
        };
        self.resolvers.store(Shared::new(ResolverCache::default()));

        #[cfg(feature = "tracing")]
        info!(
            "Disposing container {} with {} registration(s) and {} resource(s)",
            self.name,
            entries.len(),
            resources.len()
        );

        if let Some(subscription) = subscription {
            subscription.dispose();
        }
        if let (Some(parent), Some(id)) = (&self.parent, parent_resource) {
            parent.unregister_resource(id);
        }

        for (_, resource) in resources.into_iter().rev() {
            match resource {
                Resource::Owned(resource) => resource.dispose(),
                Resource::Child(child) => {
                    if let Some(child) = child.upgrade() {
                        child.dispose();
                    }
                }
            }
        }
        for entry in entries.into_iter().rev() {
            entry.dispose();
        }
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Container {
    /// A root container with the built-in feature bindings installed.
    pub fn new() -> Self {
        let container = Self::empty();
        // An empty table cannot reject the built-in bindings.
        let _ = container.configure(features::defaults());
        container
    }

    /// A root container without any binding.
    pub fn empty() -> Self {
        Self::create(String::from(ROOT), None)
    }

    /// A root container with the built-in bindings and `configurations`.
    pub fn with_configurations(configurations: Vec<Box<dyn Configuration>>) -> Result<Self, Error> {
        let container = Self::new();
        container.configure(configurations)?;
        Ok(container)
    }

    fn create(name: String, parent: Option<Container>) -> Self {
        Self {
            inner: Shared::new(ContainerInner {
                id: next_id(),
                name,
                parent,
                state: Gate::new(State::default()),
                resolvers: ArcSwap::from_pointee(ResolverCache::default()),
                events: Shared::new(Subject::default()),
            }),
        }
    }

    pub(crate) fn upgrade(inner: &WeakShared<ContainerInner>) -> Option<Container> {
        inner.upgrade().map(|inner| Container { inner })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Whether both handles point to the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }

    /// Creates a child named `"<parent>/<name>"`.
    pub fn create_child(&self, name: &str) -> Result<Container, Error> {
        self.spawn(format!("{}/{}", self.name(), name))
    }

    /// Creates a child named after a sequential number.
    pub fn child(&self) -> Result<Container, Error> {
        let number = {
            let mut state = self.inner.state.lock();
            state.children += 1;
            state.children
        };
        self.spawn(format!("{}/{}", self.name(), number))
    }

    fn spawn(&self, name: String) -> Result<Container, Error> {
        if self.is_disposed() {
            return Err(Error::container_disposed(self.name()));
        }

        let child = Container::create(name, Some(self.clone()));
        let weak = Shared::downgrade(&child.inner);
        let subscription = self.inner.events.subscribe(Shared::new(move |event: &ContainerEvent| {
            if let Some(child) = weak.upgrade() {
                child.events.emit(event);
            }
        }));

        let Some(resource) = self
            .inner
            .add_resource(Resource::Child(Shared::downgrade(&child.inner)))
        else {
            subscription.dispose();
            return Err(Error::container_disposed(self.name()));
        };
        {
            let mut state = child.inner.state.lock();
            state.parent_resource = Some(resource);
            state.parent_subscription = Some(subscription);
        }

        #[cfg(feature = "tracing")]
        info!("Created container {}", child.name());

        Ok(child)
    }

    /// Registers `dependency` under every key in `keys`, or under none.
    ///
    /// Returns `None` if any key is already bound in this container, or if
    /// the container is disposed. Bindings in ancestors never block.
    pub fn try_register<K>(
        &self,
        keys: K,
        dependency: Dependency,
        lifetime: impl IntoLifetime,
    ) -> Option<RegistrationToken>
    where
        K: IntoIterator<Item = Key>,
    {
        let mut unique = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        if unique.is_empty() {
            return None;
        }

        let entry = Shared::new(RegistrationEntry::new(unique, dependency, lifetime.into_lifetime()));
        let _descendants = {
            let mut state = self.inner.state.lock();
            if state.disposed || entry.keys().iter().any(|key| state.is_bound(key)) {
                return None;
            }
            for key in entry.keys() {
                match key.is_any_tag() {
                    true => state.any_tag.insert(key.contract().clone(), entry.clone()),
                    false => state.registrations.insert(key.clone(), entry.clone()),
                };
            }
            state.entries.push(entry.clone());
            self.inner.reset(&mut state)
        };

        #[cfg(feature = "tracing")]
        info!(
            "Registered {} key(s) in {}: {}",
            entry.keys().len(),
            self.name(),
            describe(entry.keys())
        );

        self.emit(EventKind::Registration, entry.keys());
        Some(RegistrationToken::new(Shared::downgrade(&self.inner), entry))
    }

    /// Like [`Container::try_register`], reporting a collision through the
    /// issue resolver.
    pub fn register<K>(
        &self,
        keys: K,
        dependency: Dependency,
        lifetime: impl IntoLifetime,
    ) -> Result<RegistrationToken, Error>
    where
        K: IntoIterator<Item = Key>,
    {
        let keys: Vec<Key> = keys.into_iter().collect();
        if self.is_disposed() {
            return Err(Error::container_disposed(self.name()));
        }
        match self.try_register(keys.clone(), dependency, lifetime) {
            Some(token) => Ok(token),
            None => Err(self.issues().cannot_register(self, &keys)),
        }
    }

    pub(crate) fn unregister(&self, entry: &Shared<RegistrationEntry>) {
        let (removed, _descendants) = {
            let mut state = self.inner.state.lock();
            let mut removed = Vec::new();
            for key in entry.keys() {
                let owned = match key.is_any_tag() {
                    true => state.any_tag.get(key.contract()),
                    false => state.registrations.get(key),
                }
                .is_some_and(|bound| Shared::ptr_eq(bound, entry));
                if !owned {
                    continue;
                }
                match key.is_any_tag() {
                    true => state.any_tag.remove(key.contract()),
                    false => state.registrations.remove(key),
                };
                removed.push(key.clone());
            }
            state.entries.retain(|e| e.id() != entry.id());
            let descendants = match removed.is_empty() {
                true => Vec::new(),
                false => self.inner.reset(&mut state),
            };
            (removed, descendants)
        };

        if removed.is_empty() {
            return;
        }

        #[cfg(feature = "tracing")]
        info!("Unregistered {} from {}", describe(&removed), self.name());

        self.emit(EventKind::Unregistration, &removed);
    }

    fn emit(&self, kind: EventKind, keys: &[Key]) {
        for key in keys {
            self.inner.events.emit(&ContainerEvent {
                container_id: self.id(),
                container: self.inner.name.clone(),
                kind,
                key: key.clone(),
            });
        }
    }

    /// Applies `configurations` and their dependencies, dependencies first.
    ///
    /// A configuration type is applied at most once per container. If one
    /// fails, every registration made by this call is rolled back.
    pub fn configure(&self, configurations: Vec<Box<dyn Configuration>>) -> Result<Vec<RegistrationToken>, Error> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for configuration in configurations {
            flatten(configuration, &mut seen, &mut ordered);
        }

        let mut tokens: Vec<RegistrationToken> = Vec::new();
        let mut applied = Vec::new();
        for configuration in ordered {
            let id = configuration.id();
            if !self.inner.state.lock().configured.insert(id) {
                continue;
            }
            applied.push(id);

            match configuration.apply(self) {
                Ok(mut added) => tokens.append(&mut added),
                Err(error) => {
                    for token in tokens.iter().rev() {
                        token.dispose();
                    }
                    let mut state = self.inner.state.lock();
                    for id in &applied {
                        state.configured.remove(id);
                    }
                    return Err(error);
                }
            }
        }
        Ok(tokens)
    }

    /// Applies a single configuration.
    pub fn using<C: Configuration>(&self, configuration: C) -> Result<Vec<RegistrationToken>, Error> {
        self.configure(vec![Box::new(configuration)])
    }

    /// Finds or compiles the resolver serving `key` for `requesting`.
    ///
    /// `Ok(None)` means no container in the chain has a binding. Resolvers
    /// are cached only for requests made by this container itself.
    pub(crate) fn lookup(&self, key: &Key, requesting: &Container) -> Result<Option<Resolver>, Error> {
        let own = self.ptr_eq(requesting);
        if own {
            if let Some(resolver) = self.inner.resolvers.load().get(key) {
                #[cfg(feature = "tracing")]
                debug!("Resolver cache hit for {} in {}", key, self.name());

                return Ok(Some(resolver));
            }
        }

        let (entry, generation) = {
            let state = self.inner.state.lock();
            if state.disposed {
                return Err(Error::container_disposed(self.name()));
            }
            (state.find(key), state.generation)
        };

        let resolver = match (entry, &self.inner.parent) {
            (Some(entry), _) => entry.create_resolver(key, requesting)?,
            (None, Some(parent)) => match parent.lookup(key, requesting)? {
                Some(resolver) => resolver,
                None => return Ok(None),
            },
            (None, None) => return Ok(None),
        };

        if own {
            let state = self.inner.state.lock();
            if state.generation == generation && !state.disposed {
                let cache = self.inner.resolvers.load();
                self.inner.resolvers.store(Shared::new(cache.with(key, resolver.clone())));
            }
        }
        Ok(Some(resolver))
    }

    /// The resolver serving `key`, or `None` if nothing in the chain can.
    pub fn try_get_resolver(&self, key: &Key) -> Option<Resolver> {
        self.lookup(key, self).ok().flatten()
    }

    /// The resolver serving `key`; failures go through the issue resolver.
    pub fn get_resolver(&self, key: &Key) -> Result<Resolver, Error> {
        match self.lookup(key, self) {
            Ok(Some(resolver)) => Ok(resolver),
            Ok(None) => self.issues().cannot_resolve(self, key, None),
            Err(error) => self.issues().cannot_resolve(self, key, Some(error)),
        }
    }

    /// Issue resolver bound in this container chain, or the default one.
    pub fn issues(&self) -> Shared<dyn IssueResolver> {
        self.try_get_resolver(&Key::of::<Shared<dyn IssueResolver>>())
            .and_then(|resolver| resolver.get::<Shared<dyn IssueResolver>>(self, &[]).ok())
            .unwrap_or_else(|| Shared::new(DefaultIssueResolver))
    }

    /// Autowiring strategy bound in this container chain, or the default one.
    pub fn autowiring_strategy(&self) -> Shared<dyn AutowiringStrategy> {
        self.try_get_resolver(&Key::of::<Shared<dyn AutowiringStrategy>>())
            .and_then(|resolver| resolver.get::<Shared<dyn AutowiringStrategy>>(self, &[]).ok())
            .unwrap_or_else(|| Shared::new(DefaultAutowiringStrategy))
    }

    pub fn resolve_key(&self, key: &Key, args: &[Instance]) -> Result<Instance, Error> {
        self.get_resolver(key)?.resolve(self, args)
    }

    pub fn resolve<T: Any + Clone>(&self) -> Result<T, Error> {
        self.resolve_key(&Key::of::<T>(), &[])?.downcast::<T>()
    }

    pub fn resolve_tagged<T: Any + Clone>(&self, tag: impl Into<Tag>) -> Result<T, Error> {
        self.resolve_key(&Key::tagged::<T>(tag), &[])?.downcast::<T>()
    }

    /// Resolves `T`, feeding `args` to argument-bound parameters.
    pub fn resolve_with<T: Any + Clone>(&self, args: &[Instance]) -> Result<T, Error> {
        self.resolve_key(&Key::of::<T>(), args)?.downcast::<T>()
    }

    pub fn resolve_generic<G: GenericContract + Clone>(&self) -> Result<G, Error> {
        self.resolve_key(&Key::generic::<G>(), &[])?.downcast::<G>()
    }

    /// `Ok(None)` when nothing is bound for `T`; other failures are errors.
    pub fn optional_resolve<T: Any + Clone>(&self) -> Result<Option<T>, Error> {
        match self.lookup(&Key::of::<T>(), self)? {
            Some(resolver) => resolver.get::<T>(self, &[]).map(Some),
            None => Ok(None),
        }
    }

    /// Every key bound in this container and its ancestors, in registration
    /// order, nearest container first.
    pub fn keys(&self) -> Vec<Key> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut current = Some(self);
        while let Some(container) = current {
            let entries = container.inner.state.lock().entries.clone();
            for key in entries.iter().flat_map(|entry| entry.keys()) {
                if seen.insert(key.clone()) {
                    keys.push(key.clone());
                }
            }
            current = container.parent();
        }
        keys
    }

    /// Notifies `observer` of every registration change in this container
    /// and its ancestors, for as long as the returned subscription lives.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&ContainerEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(Shared::new(observer))
    }

    /// Ties `resource` to this container: it is disposed with it. A disposed
    /// container disposes the resource right away.
    pub fn register_resource(&self, resource: impl Disposable + 'static) -> u64 {
        let resource: Box<dyn Disposable> = Box::new(resource);
        let id = next_id();
        let mut state = self.inner.state.lock();
        if state.disposed {
            drop(state);
            resource.dispose();
            return id;
        }
        state.resources.push((id, Resource::Owned(resource)));
        id
    }

    /// Releases a resource without disposing it.
    pub fn unregister_resource(&self, id: u64) -> bool {
        let mut state = self.inner.state.lock();
        let before = state.resources.len();
        state.resources.retain(|(resource, _)| *resource != id);
        state.resources.len() != before
    }

    /// Disposes children, resources and registrations, in that order.
    /// Later calls do nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for Container {
    fn dispose(&self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("parent", &self.parent().map(|parent| parent.name()))
            .field("resolvers", &self.inner.resolvers.load().len())
            .finish()
    }
}

fn flatten(
    configuration: Box<dyn Configuration>,
    seen: &mut HashSet<TypeId>,
    ordered: &mut Vec<Box<dyn Configuration>>,
) {
    if !seen.insert(configuration.id()) {
        return;
    }
    for dependency in configuration.dependencies() {
        flatten(dependency, seen, ordered);
    }
    ordered.push(configuration);
}

#[cfg(feature = "tracing")]
fn describe(keys: &[Key]) -> String {
    keys.iter().map(|key| key.to_string()).collect::<Vec<_>>().join(", ")
}
