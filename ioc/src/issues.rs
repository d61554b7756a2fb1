//! Reporting of recoverable container failures.
//!
//! Every failure the container can recover from is routed through an
//! [`IssueResolver`] bound in the container itself, so integrators can swap
//! raising an error for logging, or for a fallback. Each method has a default
//! that raises a descriptive [`Error`]; override only what you need.
//!
//! ```
//! use ioc::{Container, Dependency, Error, IssueResolver, Key, Lifetimes, Resolver, Shared, Instance};
//!
//! struct Fallback;
//!
//! impl IssueResolver for Fallback {
//!     fn cannot_resolve(&self, _: &Container, key: &Key, _: Option<Error>) -> Result<Resolver, Error> {
//!         Ok(Resolver::new(key.clone(), |_| Ok(Instance::new(0u32))))
//!     }
//! }
//!
//! let container = Container::new();
//! let child = container.create_child("app").unwrap();
//! child
//!     .register(
//!         [Key::of::<Shared<dyn IssueResolver>>()],
//!         Dependency::constant(Shared::new(Fallback) as Shared<dyn IssueResolver>),
//!         Lifetimes::Transient,
//!     )
//!     .unwrap();
//!
//! assert_eq!(child.resolve::<u32>().unwrap(), 0);
//! assert!(container.resolve::<u32>().is_err());
//! ```

use crate::container::Container;
use crate::contract::{ContractType, GenericDefinition};
use crate::error::Error;
use crate::key::Key;
use crate::reflection::TypeDescriptor;
use crate::resolver::Resolver;

pub trait IssueResolver: Send + Sync {
    /// One or more keys of a registration are already bound.
    fn cannot_register(&self, container: &Container, keys: &[Key]) -> Error {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        Error::cannot_register(container.name(), &keys.join(", "))
    }

    /// No resolver could be found or compiled for `key`. `cause` carries the
    /// compilation failure, if there was one.
    fn cannot_resolve(
        &self,
        container: &Container,
        key: &Key,
        cause: Option<Error>,
    ) -> Result<Resolver, Error> {
        Err(cause.unwrap_or_else(|| Error::cannot_resolve(container.name(), &key.to_string())))
    }

    /// Returns the index of the constructor to use instead.
    fn cannot_find_constructor(&self, descriptor: &TypeDescriptor) -> Result<usize, Error> {
        Err(Error::cannot_find_constructor(descriptor.name()))
    }

    /// Returns type arguments for `implementation` instead.
    fn cannot_resolve_generic_constraints(
        &self,
        implementation: &GenericDefinition,
        requested: &ContractType,
    ) -> Result<Vec<ContractType>, Error> {
        Err(Error::cannot_resolve_generic_constraints(
            &implementation.to_string(),
            &requested.to_string(),
        ))
    }
}

/// Raises an error for every issue.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultIssueResolver;

impl IssueResolver for DefaultIssueResolver {}
