//! Recipes describing how a binding builds its instances.
//!
//! A [`Dependency`] is either a factory closure or an [`Autowiring`] recipe.
//! Factories are the direct way. Autowiring recipes pick a constructor and
//! initializers from a [`TypeDescriptor`] and resolve their parameters from
//! the container.
//!
//! # Examples
//!
//! ```
//! use ioc::{Container, Dependency, Key, Lifetimes};
//!
//! let container = Container::new();
//! container
//!     .register([Key::of::<u32>()], Dependency::constant(7u32), Lifetimes::Transient)
//!     .unwrap();
//! container
//!     .register(
//!         [Key::of::<String>()],
//!         Dependency::factory(|ctx| Ok(format!("#{}", ctx.inject::<u32>()?))),
//!         Lifetimes::Transient,
//!     )
//!     .unwrap();
//!
//! assert_eq!(container.resolve::<String>().unwrap(), "#7");
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::autowiring::AutowiringStrategy;
use crate::container::Container;
use crate::context::Context;
use crate::dispose::Disposable;
use crate::error::Error;
use crate::instance::Instance;
use crate::key::{Key, Tag};
use crate::plan::{ConstructionPlan, Planner};
use crate::reflection::{Autowire, GenericImplementation, TypeDescriptor};
use crate::resolver::ResolveFn;
use crate::runtime::Shared;

#[derive(Clone)]
pub enum Dependency {
    Factory(Shared<ResolveFn>),
    Autowiring(Shared<Autowiring>),
}

impl Dependency {
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Context<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        Dependency::Factory(Shared::new(move |ctx: &Context<'_>| factory(ctx).map(Instance::new)))
    }

    /// Factory whose values are disposed by the lifetime that owns them.
    pub fn disposable_factory<T, F>(factory: F) -> Self
    where
        T: Disposable + Any + Clone,
        F: Fn(&Context<'_>) -> Result<T, Error> + Send + Sync + 'static,
    {
        Dependency::Factory(Shared::new(move |ctx: &Context<'_>| factory(ctx).map(Instance::disposable)))
    }

    pub fn instance_factory<F>(factory: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<Instance, Error> + Send + Sync + 'static,
    {
        Dependency::Factory(Shared::new(factory))
    }

    /// Always yields clones of `value`.
    pub fn constant<T: Any + Clone + Send + Sync>(value: T) -> Self {
        let instance = Instance::new(value);
        Dependency::Factory(Shared::new(move |_: &Context<'_>| -> Result<Instance, Error> {
            Ok(instance.clone())
        }))
    }

    pub fn autowire<T: Autowire>() -> Self {
        Self::autowiring(Autowiring::of::<T>())
    }

    pub fn autowiring(autowiring: Autowiring) -> Self {
        Dependency::Autowiring(Shared::new(autowiring))
    }

    /// Base construction logic for `key`, before any lifetime is applied.
    pub(crate) fn compile(&self, key: &Key, requesting: &Container) -> Result<Shared<ResolveFn>, Error> {
        match self {
            Dependency::Factory(factory) => Ok(factory.clone()),
            Dependency::Autowiring(autowiring) => Planner::new(requesting, key, autowiring).compile(),
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Factory(_) => f.write_str("Factory"),
            Dependency::Autowiring(autowiring) => f.debug_tuple("Autowiring").field(autowiring).finish(),
        }
    }
}

/// What an autowiring recipe builds.
#[derive(Clone, Debug)]
pub enum Target {
    Type(TypeDescriptor),
    Generic(GenericImplementation),
}

/// Full autowiring recipe.
///
/// Parameters are matched by name: `argument` feeds a parameter from the
/// positional resolve arguments, `tag` overrides the tag it is resolved with,
/// and `initializer` asks for a method to run after construction.
#[derive(Clone)]
pub struct Autowiring {
    target: Target,
    arguments: HashMap<&'static str, usize>,
    tags: HashMap<&'static str, Tag>,
    initializers: Vec<&'static str>,
    strategy: Option<Shared<dyn AutowiringStrategy>>,
}

impl Autowiring {
    pub fn of<T: Autowire>() -> Self {
        Self::descriptor(T::descriptor())
    }

    pub fn descriptor(descriptor: TypeDescriptor) -> Self {
        Self::new(Target::Type(descriptor))
    }

    pub fn generic(implementation: GenericImplementation) -> Self {
        Self::new(Target::Generic(implementation))
    }

    fn new(target: Target) -> Self {
        Self {
            target,
            arguments: HashMap::new(),
            tags: HashMap::new(),
            initializers: Vec::new(),
            strategy: None,
        }
    }

    pub fn argument(mut self, parameter: &'static str, index: usize) -> Self {
        self.arguments.insert(parameter, index);
        self
    }

    pub fn tag(mut self, parameter: &'static str, tag: impl Into<Tag>) -> Self {
        self.tags.insert(parameter, tag.into());
        self
    }

    pub fn initializer(mut self, method: &'static str) -> Self {
        self.initializers.push(method);
        self
    }

    /// Strategy consulted before the container's own.
    pub fn strategy(mut self, strategy: Shared<dyn AutowiringStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn argument_index(&self, parameter: &str) -> Option<usize> {
        self.arguments.get(parameter).copied()
    }

    pub fn tag_for(&self, parameter: &str) -> Option<&Tag> {
        self.tags.get(parameter)
    }

    pub fn requests_initializer(&self, method: &str) -> bool {
        self.initializers.iter().any(|name| *name == method)
    }

    pub fn custom_strategy(&self) -> Option<&Shared<dyn AutowiringStrategy>> {
        self.strategy.as_ref()
    }

    /// The construction plan this recipe produces for `key` when requested
    /// through `container`.
    pub fn plan(&self, container: &Container, key: &Key) -> Result<ConstructionPlan, Error> {
        Planner::new(container, key, self).plan().map(|(_, plan)| plan)
    }
}

impl fmt::Debug for Autowiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autowiring")
            .field("target", &self.target)
            .field("arguments", &self.arguments)
            .field("tags", &self.tags)
            .field("initializers", &self.initializers)
            .field("custom_strategy", &self.strategy.is_some())
            .finish()
    }
}
