//! Pluggable choice of constructors, initializers and generic arguments.
//!
//! The container asks an [`AutowiringStrategy`] three questions while it
//! compiles an autowired binding. Every method may decline by returning
//! `None`; the container then asks [`DefaultAutowiringStrategy`], and only if
//! that declines too does it report the failure through the issue resolver.

use crate::contract::{ContractType, GenericDefinition};
use crate::reflection::TypeDescriptor;

/// A constructor or initializer offered to a strategy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Position in the descriptor's constructor or method list.
    pub index: usize,
    pub name: &'static str,
    pub parameters: usize,
    /// Every parameter is bound to an argument or resolvable in the
    /// requesting container.
    pub resolvable: bool,
    /// Named by the recipe.
    pub requested: bool,
    /// Declared as autowired by the type.
    pub autowired: bool,
}

pub trait AutowiringStrategy: Send + Sync {
    fn select_constructor(&self, ty: &TypeDescriptor, candidates: &[Candidate]) -> Option<usize> {
        let _ = (ty, candidates);
        None
    }

    fn select_initializers(&self, ty: &TypeDescriptor, candidates: &[Candidate]) -> Option<Vec<usize>> {
        let _ = (ty, candidates);
        None
    }

    /// Type arguments for `implementation`, in its own parameter order, that
    /// make it serve `requested`.
    fn resolve_generic_arguments(
        &self,
        implementation: &GenericDefinition,
        requested: &ContractType,
    ) -> Option<Vec<ContractType>> {
        let _ = (implementation, requested);
        None
    }
}

/// Most resolvable parameters wins; initializers run when requested or
/// autowired; generic parameters unify by constraints, then name, then
/// position.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAutowiringStrategy;

impl AutowiringStrategy for DefaultAutowiringStrategy {
    fn select_constructor(&self, _ty: &TypeDescriptor, candidates: &[Candidate]) -> Option<usize> {
        let mut best: Option<&Candidate> = None;
        for candidate in candidates.iter().filter(|c| c.resolvable) {
            match best {
                Some(current) if current.parameters >= candidate.parameters => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|candidate| candidate.index)
    }

    fn select_initializers(&self, _ty: &TypeDescriptor, candidates: &[Candidate]) -> Option<Vec<usize>> {
        Some(
            candidates
                .iter()
                .filter(|c| c.requested || c.autowired)
                .map(|c| c.index)
                .collect(),
        )
    }

    fn resolve_generic_arguments(
        &self,
        implementation: &GenericDefinition,
        requested: &ContractType,
    ) -> Option<Vec<ContractType>> {
        let closed = requested.closed()?;
        unify(implementation, &closed.definition, &closed.arguments)
    }
}

fn unify(
    implementation: &GenericDefinition,
    contract: &GenericDefinition,
    arguments: &[ContractType],
) -> Option<Vec<ContractType>> {
    if arguments.len() != contract.parameters.len() {
        return None;
    }

    let mut bound: Vec<Option<usize>> = vec![None; implementation.parameters.len()];
    let mut used = vec![false; contract.parameters.len()];

    for (i, parameter) in implementation.parameters.iter().enumerate() {
        if !parameter.is_constrained() {
            continue;
        }
        let j = (0..contract.parameters.len())
            .find(|&j| !used[j] && parameter.same_constraints(&contract.parameters[j]))?;
        used[j] = true;
        bound[i] = Some(j);
    }

    for (i, parameter) in implementation.parameters.iter().enumerate() {
        if bound[i].is_some() {
            continue;
        }
        if let Some(j) =
            (0..contract.parameters.len()).find(|&j| !used[j] && contract.parameters[j].name == parameter.name)
        {
            used[j] = true;
            bound[i] = Some(j);
        }
    }

    for slot in bound.iter_mut().filter(|slot| slot.is_none()) {
        let j = (0..contract.parameters.len())
            .find(|&j| !used[j] && !contract.parameters[j].is_constrained())?;
        used[j] = true;
        *slot = Some(j);
    }

    bound
        .into_iter()
        .map(|slot| slot.map(|j| arguments[j].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{GenericContract, GenericParameter};

    fn candidate(index: usize, parameters: usize, resolvable: bool) -> Candidate {
        Candidate {
            index,
            name: "new",
            parameters,
            resolvable,
            requested: false,
            autowired: false,
        }
    }

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<u8>().build()
    }

    #[test]
    fn picks_most_resolvable_parameters() {
        let candidates = [
            candidate(0, 1, true),
            candidate(1, 3, false),
            candidate(2, 2, true),
            candidate(3, 2, true),
        ];
        let chosen = DefaultAutowiringStrategy.select_constructor(&descriptor(), &candidates);
        assert_eq!(chosen, Some(2));
    }

    #[test]
    fn declines_without_resolvable_constructor() {
        let candidates = [candidate(0, 1, false)];
        let chosen = DefaultAutowiringStrategy.select_constructor(&descriptor(), &candidates);
        assert_eq!(chosen, None);
    }

    #[test]
    fn selects_requested_and_autowired_initializers() {
        let mut requested = candidate(0, 1, true);
        requested.requested = true;
        let skipped = candidate(1, 1, true);
        let mut autowired = candidate(2, 0, true);
        autowired.autowired = true;

        let chosen = DefaultAutowiringStrategy
            .select_initializers(&descriptor(), &[requested, skipped, autowired]);
        assert_eq!(chosen, Some(vec![0, 2]));
    }

    const MAP: GenericDefinition = GenericDefinition {
        name: "tests::Map",
        parameters: &[
            GenericParameter {
                name: "K",
                constraints: &["Hash", "Eq"],
            },
            GenericParameter {
                name: "V",
                constraints: &[],
            },
        ],
    };

    const STORE: GenericDefinition = GenericDefinition {
        name: "tests::Store",
        parameters: &[
            GenericParameter {
                name: "Item",
                constraints: &[],
            },
            GenericParameter {
                name: "Id",
                constraints: &["Eq", "Hash"],
            },
        ],
    };

    const ORDERED: GenericDefinition = GenericDefinition {
        name: "tests::Ordered",
        parameters: &[
            GenericParameter {
                name: "K",
                constraints: &["Ord"],
            },
            GenericParameter {
                name: "V",
                constraints: &[],
            },
        ],
    };

    struct MapOf<K, V>(std::marker::PhantomData<fn() -> (K, V)>);

    impl<K: 'static, V: 'static> GenericContract for MapOf<K, V> {
        fn definition() -> GenericDefinition {
            MAP
        }

        fn arguments() -> Vec<ContractType> {
            vec![ContractType::of::<K>(), ContractType::of::<V>()]
        }
    }

    #[test]
    fn unifies_by_constraints_then_position() {
        let requested = ContractType::generic::<MapOf<u64, String>>();
        let arguments = DefaultAutowiringStrategy
            .resolve_generic_arguments(&STORE, &requested)
            .unwrap();
        assert_eq!(
            arguments,
            vec![ContractType::of::<String>(), ContractType::of::<u64>()]
        );
    }

    #[test]
    fn identical_definitions_unify_by_name() {
        let requested = ContractType::generic::<MapOf<u8, i8>>();
        let arguments = DefaultAutowiringStrategy
            .resolve_generic_arguments(&MAP, &requested)
            .unwrap();
        assert_eq!(arguments, vec![ContractType::of::<u8>(), ContractType::of::<i8>()]);
    }

    #[test]
    fn mismatched_constraints_fail() {
        let requested = ContractType::generic::<MapOf<u8, i8>>();
        assert!(
            DefaultAutowiringStrategy
                .resolve_generic_arguments(&ORDERED, &requested)
                .is_none()
        );
    }

    #[test]
    fn plain_types_do_not_unify() {
        assert!(
            DefaultAutowiringStrategy
                .resolve_generic_arguments(&MAP, &ContractType::of::<u8>())
                .is_none()
        );
    }
}
