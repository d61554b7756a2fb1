use std::any::Any;

use crate::configuration::{Binding, Configuration, register_all};
use crate::container::Container;
use crate::contract::{ContractType, GenericContract, GenericDefinition, GenericParameter, Witness};
use crate::error::Error;
use crate::instance::Instance;
use crate::key::Key;
use crate::lifetime::Lifetimes;
use crate::registration::RegistrationToken;

use super::{Composed, composed, part};

const UNBOUND: &[&str] = &[];

pub const PAIR: GenericDefinition = GenericDefinition {
    name: "Tuple",
    parameters: &[
        GenericParameter { name: "A", constraints: UNBOUND },
        GenericParameter { name: "B", constraints: UNBOUND },
    ],
};

pub const TRIPLE: GenericDefinition = GenericDefinition {
    name: "Tuple",
    parameters: &[
        GenericParameter { name: "A", constraints: UNBOUND },
        GenericParameter { name: "B", constraints: UNBOUND },
        GenericParameter { name: "C", constraints: UNBOUND },
    ],
};

fn compose_pair<A, B>(parts: Vec<Instance>) -> Result<Instance, Error>
where
    A: Any + Clone + Send + Sync,
    B: Any + Clone + Send + Sync,
{
    Ok(Instance::new((part::<A>(&parts, 0)?, part::<B>(&parts, 1)?)))
}

fn compose_triple<A, B, C>(parts: Vec<Instance>) -> Result<Instance, Error>
where
    A: Any + Clone + Send + Sync,
    B: Any + Clone + Send + Sync,
    C: Any + Clone + Send + Sync,
{
    Ok(Instance::new((
        part::<A>(&parts, 0)?,
        part::<B>(&parts, 1)?,
        part::<C>(&parts, 2)?,
    )))
}

impl<A, B> GenericContract for (A, B)
where
    A: Any + Clone + Send + Sync,
    B: Any + Clone + Send + Sync,
{
    fn definition() -> GenericDefinition {
        PAIR
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<A>(), ContractType::of::<B>()]
    }

    fn witness() -> Option<Witness> {
        Some(Witness::new(Composed(compose_pair::<A, B>)))
    }
}

impl<A, B, C> GenericContract for (A, B, C)
where
    A: Any + Clone + Send + Sync,
    B: Any + Clone + Send + Sync,
    C: Any + Clone + Send + Sync,
{
    fn definition() -> GenericDefinition {
        TRIPLE
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<A>(), ContractType::of::<B>(), ContractType::of::<C>()]
    }

    fn witness() -> Option<Witness> {
        Some(Witness::new(Composed(compose_triple::<A, B, C>)))
    }
}

/// Tuples of two and three elements, each resolved with the tag of the
/// request.
pub struct TupleFeature;

impl Configuration for TupleFeature {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        register_all(
            container,
            vec![
                Binding::new([Key::open(PAIR)], composed(), Lifetimes::Transient),
                Binding::new([Key::open(TRIPLE)], composed(), Lifetimes::Transient),
            ],
        )
    }
}
