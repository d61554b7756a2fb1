use std::any::Any;
use std::fmt;

use once_cell::sync::OnceCell;

use crate::configuration::Configuration;
use crate::container::Container;
use crate::contract::{ContractType, GenericContract, GenericDefinition, GenericParameter, Witness};
use crate::error::Error;
use crate::instance::Instance;
use crate::key::Key;
use crate::lifetime::Lifetimes;
use crate::registration::RegistrationToken;
use crate::runtime::Shared;

use super::{CallFn, Deferred, deferred};

pub const LAZY: GenericDefinition = GenericDefinition {
    name: "Lazy",
    parameters: &[GenericParameter {
        name: "T",
        constraints: &[],
    }],
};

/// Resolves `T` on first use and keeps it. Clones share the value.
pub struct Lazy<T> {
    call: Shared<CallFn>,
    cell: Shared<OnceCell<T>>,
}

impl<T: Any + Clone + Send + Sync> Lazy<T> {
    /// The value, resolving it first if needed. A failed resolution is not
    /// kept, so the next call tries again.
    pub fn value(&self) -> Result<T, Error> {
        self.cell
            .get_or_try_init(|| -> Result<T, Error> { (self.call)(&[])?.downcast::<T>() })
            .cloned()
    }

    pub fn is_created(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("type", &std::any::type_name::<T>())
            .field("created", &self.cell.get().is_some())
            .finish()
    }
}

fn build<T: Any + Clone + Send + Sync>(call: Shared<CallFn>) -> Instance {
    Instance::new(Lazy::<T> {
        call,
        cell: Shared::new(OnceCell::new()),
    })
}

impl<T: Any + Clone + Send + Sync> GenericContract for Lazy<T> {
    fn definition() -> GenericDefinition {
        LAZY
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<T>()]
    }

    fn witness() -> Option<Witness> {
        Some(Witness::new(Deferred(build::<T>)))
    }
}

pub struct LazyFeature;

impl Configuration for LazyFeature {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        let token = container.register([Key::open(LAZY)], deferred(), Lifetimes::Transient)?;
        Ok(vec![token])
    }
}
