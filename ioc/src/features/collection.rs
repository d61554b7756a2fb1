use std::any::Any;

use crate::configuration::Configuration;
use crate::container::Container;
use crate::contract::{ContractType, GenericContract, GenericDefinition, GenericParameter, Witness};
use crate::dependency::Dependency;
use crate::error::Error;
use crate::instance::Instance;
use crate::key::Key;
use crate::lifetime::Lifetimes;
use crate::registration::RegistrationToken;

use super::{Composed, witness};

pub const ALL: GenericDefinition = GenericDefinition {
    name: "All",
    parameters: &[GenericParameter {
        name: "T",
        constraints: &[],
    }],
};

/// Every instance of `T` bound in the resolving container and its
/// ancestors, one per key, in registration order. Wildcard bindings are
/// left out.
#[derive(Clone, Debug)]
pub struct All<T> {
    items: Vec<T>,
}

impl<T> All<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> IntoIterator for All<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a All<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn compose<T: Any + Clone + Send + Sync>(parts: Vec<Instance>) -> Result<Instance, Error> {
    let items = parts
        .iter()
        .map(|part| part.downcast::<T>())
        .collect::<Result<Vec<T>, Error>>()?;
    Ok(Instance::new(All { items }))
}

impl<T: Any + Clone + Send + Sync> GenericContract for All<T> {
    fn definition() -> GenericDefinition {
        ALL
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<T>()]
    }

    fn witness() -> Option<Witness> {
        Some(Witness::new(Composed(compose::<T>)))
    }
}

pub struct CollectionFeature;

impl Configuration for CollectionFeature {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        let dependency = Dependency::instance_factory(|ctx| {
            let compose = witness::<Composed>(ctx)?.0;
            let element = ctx
                .key()
                .contract()
                .generic_arguments()
                .first()
                .cloned()
                .ok_or_else(|| Error::type_mismatch(&ctx.key().to_string()))?;

            let keys: Vec<Key> = ctx
                .container()
                .keys()
                .into_iter()
                .filter(|key| *key.contract() == element && !key.is_any_tag())
                .collect();
            let mut parts = Vec::with_capacity(keys.len());
            for key in &keys {
                parts.push(ctx.inject_key(key)?);
            }
            compose(parts)
        });

        let token = container.register([Key::open(ALL)], dependency, Lifetimes::Transient)?;
        Ok(vec![token])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_across_the_hierarchy() {
        let root = Container::new();
        root.register([Key::tagged::<u32>(1)], Dependency::constant(1u32), Lifetimes::Transient)
            .unwrap();
        root.register([Key::of::<u32>().any()], Dependency::constant(0u32), Lifetimes::Transient)
            .unwrap();
        let child = root.create_child("child").unwrap();
        child
            .register([Key::tagged::<u32>(2)], Dependency::constant(2u32), Lifetimes::Transient)
            .unwrap();
        child
            .register([Key::tagged::<u32>(1)], Dependency::constant(10u32), Lifetimes::Transient)
            .unwrap();

        let all = child.resolve_generic::<All<u32>>().unwrap();
        let mut values = all.into_vec();
        values.sort();
        assert_eq!(values, vec![2, 10]);

        let all = root.resolve_generic::<All<u32>>().unwrap();
        assert_eq!(all.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn empty_when_nothing_is_bound() {
        let container = Container::new();
        let all = container.resolve_generic::<All<u64>>().unwrap();
        assert!(all.is_empty());
    }
}
