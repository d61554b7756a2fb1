//! Contract types: the runtime identity of what a consumer asks for.
//!
//! Rust has no runtime reflection over generic types, so the container carries
//! the structure it needs explicitly:
//!
//! - [`ContractType::Type`] identifies any concrete `'static` Rust type by
//!   [`TypeId`], including trait-object handles such as `Shared<dyn Service>`.
//! - [`ContractType::Definition`] is an open generic shape (`Repo<T>`), which
//!   a registration may bind to serve every closed form of it.
//! - [`ContractType::Closed`] is a closed generic type built from a
//!   [`GenericContract`] implementation. It knows its definition and its type
//!   arguments, and may carry a [`Witness`] that lets type-erased bindings
//!   build a value of the exact Rust type.
//!
//! `Type` and `Closed` compare by [`TypeId`], so `ContractType::of::<X>()` and
//! `ContractType::generic::<X>()` are the same key in a registration table.
//!
//! # Examples
//!
//! ```
//! use ioc::contract::{ContractType, GenericContract, GenericDefinition, GenericParameter};
//!
//! struct Wrapper<T>(T);
//!
//! const WRAPPER: GenericDefinition = GenericDefinition {
//!     name: "Wrapper",
//!     parameters: &[GenericParameter { name: "T", constraints: &[] }],
//! };
//!
//! impl<T: Send + Sync + 'static> GenericContract for Wrapper<T> {
//!     fn definition() -> GenericDefinition {
//!         WRAPPER
//!     }
//!
//!     fn arguments() -> Vec<ContractType> {
//!         vec![ContractType::of::<T>()]
//!     }
//! }
//!
//! let closed = ContractType::generic::<Wrapper<u8>>();
//! assert_eq!(closed, ContractType::of::<Wrapper<u8>>());
//! assert_eq!(closed.generic_definition(), Some(WRAPPER));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::runtime::Shared;

/// A type parameter of an open generic definition.
///
/// `constraints` name the bounds the parameter carries. Two parameters with
/// the same set of constraints are considered interchangeable when an
/// implementation is unified with a requested contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GenericParameter {
    pub name: &'static str,
    pub constraints: &'static [&'static str],
}

impl GenericParameter {
    pub const fn new(name: &'static str, constraints: &'static [&'static str]) -> Self {
        Self { name, constraints }
    }

    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
    }

    /// Whether both parameters carry the same constraints, in any order.
    pub fn same_constraints(&self, other: &GenericParameter) -> bool {
        self.constraints.len() == other.constraints.len()
            && self.constraints.iter().all(|c| other.constraints.contains(c))
            && other.constraints.iter().all(|c| self.constraints.contains(c))
    }
}

/// An open generic shape such as `Repo<T>`.
///
/// Definitions are identified by `name` and `parameters`; give each one a
/// distinct name, typically including the module path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GenericDefinition {
    pub name: &'static str,
    pub parameters: &'static [GenericParameter],
}

impl GenericDefinition {
    pub const fn new(name: &'static str, parameters: &'static [GenericParameter]) -> Self {
        Self { name, parameters }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Display for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.parameters.iter().map(|p| p.name).collect();
        write!(f, "{}<{}>", self.name, names.join(", "))
    }
}

/// Type-specific helper value carried by a closed generic contract.
///
/// Usually a monomorphized function pointer that builds the closed Rust value
/// from type-erased parts.
#[derive(Clone)]
pub struct Witness(Shared<dyn Any + Send + Sync>);

impl Witness {
    pub fn new<W: Any + Send + Sync>(witness: W) -> Self {
        Self(Shared::new(witness))
    }

    pub fn downcast_ref<W: Any>(&self) -> Option<&W> {
        self.0.downcast_ref::<W>()
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Witness")
    }
}

/// A closed generic contract, e.g. `Shared<dyn Repo<i32>>`.
#[derive(Debug)]
pub struct ClosedGeneric {
    pub id: TypeId,
    pub name: &'static str,
    pub definition: GenericDefinition,
    pub arguments: Vec<ContractType>,
    pub witness: Option<Witness>,
}

/// Implemented by closed generic Rust types that can be requested as
/// [`ContractType::Closed`].
pub trait GenericContract: Any + Send + Sync {
    fn definition() -> GenericDefinition;

    fn arguments() -> Vec<ContractType>;

    fn witness() -> Option<Witness> {
        None
    }
}

/// Generic trait objects served behind a [`Shared`] handle.
///
/// Implement this for `dyn MyTrait<T>` to make `Shared<dyn MyTrait<T>>` a
/// [`GenericContract`].
///
/// ```
/// use ioc::contract::{ContractType, GenericDefinition, GenericInterface, GenericParameter};
/// use ioc::runtime::Shared;
///
/// trait Repo<T>: Send + Sync {}
///
/// const REPO: GenericDefinition = GenericDefinition {
///     name: "Repo",
///     parameters: &[GenericParameter { name: "T", constraints: &[] }],
/// };
///
/// impl<T: 'static> GenericInterface for dyn Repo<T> {
///     fn definition() -> GenericDefinition {
///         REPO
///     }
///
///     fn arguments() -> Vec<ContractType> {
///         vec![ContractType::of::<T>()]
///     }
/// }
///
/// let contract = ContractType::generic::<Shared<dyn Repo<i32>>>();
/// assert!(contract.is_closed_generic());
/// ```
pub trait GenericInterface: 'static {
    fn definition() -> GenericDefinition;

    fn arguments() -> Vec<ContractType>;
}

impl<C> GenericContract for Shared<C>
where
    C: ?Sized + GenericInterface + Send + Sync,
{
    fn definition() -> GenericDefinition {
        C::definition()
    }

    fn arguments() -> Vec<ContractType> {
        C::arguments()
    }
}

/// The contract half of a [`Key`](crate::key::Key).
#[derive(Clone, Debug)]
pub enum ContractType {
    Type { id: TypeId, name: &'static str },
    Definition(GenericDefinition),
    Closed(Shared<ClosedGeneric>),
}

#[derive(PartialEq, Eq, Hash)]
enum Identity<'a> {
    Type(TypeId),
    Definition(&'a GenericDefinition),
}

impl ContractType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        ContractType::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn generic<G: GenericContract>() -> Self {
        ContractType::Closed(Shared::new(ClosedGeneric {
            id: TypeId::of::<G>(),
            name: std::any::type_name::<G>(),
            definition: G::definition(),
            arguments: G::arguments(),
            witness: G::witness(),
        }))
    }

    pub fn definition(definition: GenericDefinition) -> Self {
        ContractType::Definition(definition)
    }

    fn identity(&self) -> Identity<'_> {
        match self {
            ContractType::Type { id, .. } => Identity::Type(*id),
            ContractType::Closed(closed) => Identity::Type(closed.id),
            ContractType::Definition(definition) => Identity::Definition(definition),
        }
    }

    /// The Rust type behind the contract; `None` for open definitions.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            ContractType::Type { id, .. } => Some(*id),
            ContractType::Closed(closed) => Some(closed.id),
            ContractType::Definition(_) => None,
        }
    }

    /// The open definition of a closed generic, or the definition itself.
    pub fn generic_definition(&self) -> Option<GenericDefinition> {
        match self {
            ContractType::Type { .. } => None,
            ContractType::Closed(closed) => Some(closed.definition),
            ContractType::Definition(definition) => Some(*definition),
        }
    }

    pub fn generic_arguments(&self) -> &[ContractType] {
        match self {
            ContractType::Closed(closed) => &closed.arguments,
            _ => &[],
        }
    }

    pub fn closed(&self) -> Option<&ClosedGeneric> {
        match self {
            ContractType::Closed(closed) => Some(closed),
            _ => None,
        }
    }

    pub fn is_closed_generic(&self) -> bool {
        matches!(self, ContractType::Closed(_))
    }

    pub fn is_open_generic(&self) -> bool {
        matches!(self, ContractType::Definition(_))
    }

    pub fn witness(&self) -> Option<&Witness> {
        self.closed().and_then(|closed| closed.witness.as_ref())
    }
}

impl PartialEq for ContractType {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ContractType {}

impl Hash for ContractType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractType::Type { name, .. } => f.write_str(name),
            ContractType::Closed(closed) => f.write_str(closed.name),
            ContractType::Definition(definition) => write!(f, "{}", definition),
        }
    }
}
