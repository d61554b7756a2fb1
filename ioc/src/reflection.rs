//! Type descriptors: the construction surface of a concrete type.
//!
//! A [`TypeDescriptor`] lists what autowiring may use to build a type: its
//! constructors, the initializer methods that may run after construction, and
//! the contracts a constructed value can be served as. Descriptors are built
//! with a typed [`DescriptorBuilder`], so every closure sees the real type.
//!
//! # Examples
//!
//! ```
//! use ioc::reflection::{Autowire, Parameter, TypeDescriptor};
//! use ioc::runtime::Shared;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Polite {
//!     name: String,
//! }
//!
//! impl Greeter for Polite {
//!     fn greet(&self) -> String {
//!         format!("Good day, {}", self.name)
//!     }
//! }
//!
//! impl Autowire for Polite {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::of::<Polite>()
//!             .constructor("new", vec![Parameter::of::<String>("name")], |args| {
//!                 Ok(Polite { name: args.get(0)? })
//!             })
//!             .implements::<Shared<dyn Greeter>, _>(|p| Shared::new(p) as Shared<dyn Greeter>)
//!             .build()
//!     }
//! }
//!
//! let descriptor = Polite::descriptor();
//! assert_eq!(descriptor.constructors().len(), 1);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::contract::{ContractType, GenericContract, GenericDefinition};
use crate::dispose::Disposable;
use crate::error::Error;
use crate::instance::Instance;
use crate::key::{Key, Tag};
use crate::runtime::Shared;

type ConstructFn = dyn Fn(&Arguments) -> Result<Box<dyn Any + Send + Sync>, Error> + Send + Sync;
type InvokeFn = dyn Fn(&mut (dyn Any + Send + Sync), &Arguments) -> Result<(), Error> + Send + Sync;
type CastFn = dyn Fn(Box<dyn Any + Send + Sync>) -> Result<Instance, Error> + Send + Sync;

/// A constructor or method parameter, resolved by contract and tag.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: &'static str,
    pub contract: ContractType,
    pub tag: Option<Tag>,
}

impl Parameter {
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            contract: ContractType::of::<T>(),
            tag: None,
        }
    }

    pub fn generic<G: GenericContract>(name: &'static str) -> Self {
        Self {
            name,
            contract: ContractType::generic::<G>(),
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn key(&self) -> Key {
        Key::new(self.contract.clone(), self.tag.clone())
    }
}

/// Values collected for one constructor or method call, in parameter order.
pub struct Arguments {
    values: Vec<Instance>,
}

impl Arguments {
    pub fn new(values: Vec<Instance>) -> Self {
        Self { values }
    }

    pub fn get<T: Any + Clone>(&self, index: usize) -> Result<T, Error> {
        self.values
            .get(index)
            .ok_or_else(|| Error::missing_argument(index, std::any::type_name::<T>()))?
            .downcast::<T>()
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone)]
pub struct Constructor {
    pub name: &'static str,
    pub parameters: Vec<Parameter>,
    construct: Shared<ConstructFn>,
}

impl Constructor {
    pub fn construct(&self, arguments: &Arguments) -> Result<Box<dyn Any + Send + Sync>, Error> {
        (self.construct)(arguments)
    }
}

/// An initializer that may run on a freshly constructed value.
///
/// `autowired` methods run whenever the type is autowired; the others only
/// when a recipe asks for them by name.
#[derive(Clone)]
pub struct Method {
    pub name: &'static str,
    pub parameters: Vec<Parameter>,
    pub autowired: bool,
    invoke: Shared<InvokeFn>,
}

impl Method {
    pub fn invoke(
        &self,
        target: &mut (dyn Any + Send + Sync),
        arguments: &Arguments,
    ) -> Result<(), Error> {
        (self.invoke)(target, arguments)
    }
}

#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    casts: HashMap<TypeId, Shared<CastFn>>,
}

impl TypeDescriptor {
    /// Starts a descriptor for `T`. Values are served as `Shared<T>` unless
    /// other contracts are declared with [`DescriptorBuilder::implements`].
    pub fn of<T: Any + Send + Sync>() -> DescriptorBuilder<T> {
        let shared: Shared<CastFn> = Shared::new(|value: Box<dyn Any + Send + Sync>| -> Result<Instance, Error> {
            let value = value
                .downcast::<T>()
                .map_err(|_| Error::type_mismatch(std::any::type_name::<T>()))?;
            Ok(Instance::new(Shared::<T>::from(value)))
        });
        let mut casts = HashMap::new();
        casts.insert(TypeId::of::<Shared<T>>(), shared);

        DescriptorBuilder {
            descriptor: TypeDescriptor {
                id: TypeId::of::<T>(),
                name: std::any::type_name::<T>(),
                constructors: Vec::new(),
                methods: Vec::new(),
                casts,
            },
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn can_serve(&self, contract: &ContractType) -> bool {
        contract
            .type_id()
            .is_some_and(|id| self.casts.contains_key(&id))
    }

    /// Converts a constructed value into an instance of `contract`.
    pub fn cast(
        &self,
        value: Box<dyn Any + Send + Sync>,
        contract: &ContractType,
    ) -> Result<Instance, Error> {
        let cast = contract
            .type_id()
            .and_then(|id| self.casts.get(&id))
            .ok_or_else(|| Error::type_mismatch(&contract.to_string()))?;
        cast(value)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constructors: Vec<&str> = self.constructors.iter().map(|c| c.name).collect();
        let methods: Vec<&str> = self.methods.iter().map(|m| m.name).collect();
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("constructors", &constructors)
            .field("methods", &methods)
            .finish()
    }
}

/// Typed builder for a [`TypeDescriptor`].
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> DescriptorBuilder<T> {
    pub fn constructor<F>(mut self, name: &'static str, parameters: Vec<Parameter>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T, Error> + Send + Sync + 'static,
    {
        let construct: Shared<ConstructFn> = Shared::new(move |arguments: &Arguments| {
            construct(arguments).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
        });
        self.descriptor.constructors.push(Constructor {
            name,
            parameters,
            construct,
        });
        self
    }

    /// Declares an initializer that runs only when a recipe names it.
    pub fn method<F>(self, name: &'static str, parameters: Vec<Parameter>, invoke: F) -> Self
    where
        F: Fn(&mut T, &Arguments) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.push_method(name, parameters, false, invoke)
    }

    /// Declares an initializer that runs every time the type is autowired.
    pub fn autowired<F>(self, name: &'static str, parameters: Vec<Parameter>, invoke: F) -> Self
    where
        F: Fn(&mut T, &Arguments) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.push_method(name, parameters, true, invoke)
    }

    fn push_method<F>(
        mut self,
        name: &'static str,
        parameters: Vec<Parameter>,
        autowired: bool,
        invoke: F,
    ) -> Self
    where
        F: Fn(&mut T, &Arguments) -> Result<(), Error> + Send + Sync + 'static,
    {
        let invoke: Shared<InvokeFn> = Shared::new(
            move |target: &mut (dyn Any + Send + Sync), arguments: &Arguments| -> Result<(), Error> {
                let target = target
                    .downcast_mut::<T>()
                    .ok_or_else(|| Error::type_mismatch(std::any::type_name::<T>()))?;
                invoke(target, arguments)
            },
        );
        self.descriptor.methods.push(Method {
            name,
            parameters,
            autowired,
            invoke,
        });
        self
    }

    /// Serves the type as contract `C`.
    pub fn implements<C, F>(mut self, cast: F) -> Self
    where
        C: Any + Send + Sync,
        F: Fn(T) -> C + Send + Sync + 'static,
    {
        let cast: Shared<CastFn> = Shared::new(move |value: Box<dyn Any + Send + Sync>| -> Result<Instance, Error> {
            let value = value
                .downcast::<T>()
                .map_err(|_| Error::type_mismatch(std::any::type_name::<T>()))?;
            Ok(Instance::new(cast(*value)))
        });
        self.descriptor.casts.insert(TypeId::of::<C>(), cast);
        self
    }

    /// Serves the type as contract `C`, disposed together with its owning
    /// lifetime.
    pub fn implements_disposable<C, F>(mut self, cast: F) -> Self
    where
        C: Disposable + Any + Clone,
        F: Fn(T) -> C + Send + Sync + 'static,
    {
        let cast: Shared<CastFn> = Shared::new(move |value: Box<dyn Any + Send + Sync>| -> Result<Instance, Error> {
            let value = value
                .downcast::<T>()
                .map_err(|_| Error::type_mismatch(std::any::type_name::<T>()))?;
            Ok(Instance::disposable(cast(*value)))
        });
        self.descriptor.casts.insert(TypeId::of::<C>(), cast);
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Types that describe their own construction surface.
pub trait Autowire: Any + Send + Sync {
    fn descriptor() -> TypeDescriptor;
}

/// An open generic implementation such as `MemoryRepo<T>`.
///
/// Rust monomorphizes generics at compile time, so every closed form that may
/// be served is declared up front, keyed by its type arguments in the order of
/// the implementation's own parameters.
#[derive(Clone)]
pub struct GenericImplementation {
    definition: GenericDefinition,
    instantiations: HashMap<Vec<ContractType>, fn() -> TypeDescriptor>,
}

impl GenericImplementation {
    pub fn new(definition: GenericDefinition) -> Self {
        Self {
            definition,
            instantiations: HashMap::new(),
        }
    }

    pub fn instantiation(mut self, arguments: Vec<ContractType>, descriptor: fn() -> TypeDescriptor) -> Self {
        self.instantiations.insert(arguments, descriptor);
        self
    }

    /// Declares the closed form `T`, which describes itself.
    pub fn close<T: Autowire + GenericContract>(self) -> Self {
        self.instantiation(T::arguments(), T::descriptor)
    }

    pub fn definition(&self) -> GenericDefinition {
        self.definition
    }

    pub fn descriptor(&self, arguments: &[ContractType]) -> Option<TypeDescriptor> {
        self.instantiations.get(arguments).map(|descriptor| descriptor())
    }
}

impl fmt::Debug for GenericImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericImplementation")
            .field("definition", &self.definition)
            .field("instantiations", &self.instantiations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    trait Named: Send + Sync {
        fn name(&self) -> String;
    }

    struct Person {
        name: String,
        age: u32,
    }

    impl Named for Person {
        fn name(&self) -> String {
            self.name.clone()
        }
    }

    fn person() -> TypeDescriptor {
        TypeDescriptor::of::<Person>()
            .constructor("new", vec![Parameter::of::<String>("name")], |args| {
                Ok(Person {
                    name: args.get(0)?,
                    age: 0,
                })
            })
            .method("set_age", vec![Parameter::of::<u32>("age")], |person, args| {
                person.age = args.get(0)?;
                Ok(())
            })
            .implements::<Shared<dyn Named>, _>(|p| Shared::new(p) as Shared<dyn Named>)
            .build()
    }

    #[test]
    fn constructs_initializes_and_casts() {
        let descriptor = person();
        let constructor = &descriptor.constructors()[0];
        let mut value = constructor
            .construct(&Arguments::new(vec![Instance::new(String::from("Ada"))]))
            .unwrap();

        descriptor.methods()[0]
            .invoke(&mut *value, &Arguments::new(vec![Instance::new(36u32)]))
            .unwrap();

        let instance = descriptor
            .cast(value, &ContractType::of::<Shared<Person>>())
            .unwrap();
        let person = instance.downcast::<Shared<Person>>().unwrap();
        assert_eq!(person.name, "Ada");
        assert_eq!(person.age, 36);
    }

    #[test]
    fn casts_to_declared_contract() {
        let descriptor = person();
        let contract = ContractType::of::<Shared<dyn Named>>();
        assert!(descriptor.can_serve(&contract));
        assert!(!descriptor.can_serve(&ContractType::of::<String>()));

        let value = descriptor.constructors()[0]
            .construct(&Arguments::new(vec![Instance::new(String::from("Bob"))]))
            .unwrap();
        let named = descriptor
            .cast(value, &contract)
            .unwrap()
            .downcast::<Shared<dyn Named>>()
            .unwrap();
        assert_eq!(named.name(), "Bob");
    }

    #[test]
    fn missing_argument_is_reported() {
        let descriptor = person();
        let err = descriptor.constructors()[0]
            .construct(&Arguments::new(vec![]))
            .err()
            .unwrap();
        assert_eq!(err.kind, ErrorKind::MissingArgument);
    }

    #[test]
    fn parameters_build_keys() {
        let parameter = Parameter::of::<String>("name").tagged("primary");
        assert_eq!(parameter.key(), Key::tagged::<String>("primary"));
    }
}
