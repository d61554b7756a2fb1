use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

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

pub const FUNC: GenericDefinition = GenericDefinition {
    name: "Func",
    parameters: &[GenericParameter {
        name: "T",
        constraints: &[],
    }],
};

/// Resolves `T` on every call.
///
/// Arguments passed to [`Func::call_with`] reach argument-bound parameters
/// of the binding, or [`Context::arg`](crate::context::Context::arg) in a
/// factory.
pub struct Func<T> {
    call: Shared<CallFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Clone + Send + Sync> Func<T> {
    pub fn call(&self) -> Result<T, Error> {
        self.call_with(&[])
    }

    pub fn call_with(&self, args: &[Instance]) -> Result<T, Error> {
        (self.call)(args)?.downcast::<T>()
    }
}

impl<T> Clone for Func<T> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Func<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func<{}>", std::any::type_name::<T>())
    }
}

fn build<T: Any + Clone + Send + Sync>(call: Shared<CallFn>) -> Instance {
    Instance::new(Func::<T> {
        call,
        _marker: PhantomData,
    })
}

impl<T: Any + Clone + Send + Sync> GenericContract for Func<T> {
    fn definition() -> GenericDefinition {
        FUNC
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<T>()]
    }

    fn witness() -> Option<Witness> {
        Some(Witness::new(Deferred(build::<T>)))
    }
}

pub struct FuncFeature;

impl Configuration for FuncFeature {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        let token = container.register([Key::open(FUNC)], deferred(), Lifetimes::Transient)?;
        Ok(vec![token])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Dependency;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn each_call_resolves_again() {
        let container = Container::new();
        let created = Shared::new(AtomicUsize::new(0));
        let counter = created.clone();
        container
            .register(
                [Key::of::<usize>()],
                Dependency::factory(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))),
                Lifetimes::Transient,
            )
            .unwrap();

        let func = container.resolve_generic::<Func<usize>>().unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 0);
        assert_eq!(func.call().unwrap(), 0);
        assert_eq!(func.call().unwrap(), 1);
    }

    #[test]
    fn arguments_reach_the_factory() {
        let container = Container::new();
        container
            .register(
                [Key::of::<String>()],
                Dependency::factory(|ctx| Ok(format!("{}-{}", ctx.arg::<&'static str>(0)?, ctx.arg::<u8>(1)?))),
                Lifetimes::Transient,
            )
            .unwrap();

        let func = container.resolve_generic::<Func<String>>().unwrap();
        let value = func
            .call_with(&[Instance::new("id"), Instance::new(7u8)])
            .unwrap();
        assert_eq!(value, "id-7");
    }

    #[test]
    fn tag_of_the_request_is_kept() {
        let container = Container::new();
        container
            .register([Key::tagged::<u8>("x")], Dependency::constant(9u8), Lifetimes::Transient)
            .unwrap();

        let func = container
            .resolve_key(&Key::generic::<Func<u8>>().with_tag(Some("x".into())), &[])
            .unwrap()
            .downcast::<Func<u8>>()
            .unwrap();
        assert_eq!(func.call().unwrap(), 9);
    }
}
