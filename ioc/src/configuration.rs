//! Batches of related bindings.
//!
//! ```
//! use ioc::{Binding, Configuration, Container, Dependency, Error, Key, Lifetimes, RegistrationToken};
//!
//! struct Settings;
//!
//! impl Configuration for Settings {
//!     fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
//!         ioc::register_all(
//!             container,
//!             vec![
//!                 Binding::new([Key::tagged::<u16>("port")], Dependency::constant(8080u16), Lifetimes::Transient),
//!                 Binding::new([Key::tagged::<String>("host")], Dependency::constant(String::from("localhost")), Lifetimes::Transient),
//!             ],
//!         )
//!     }
//! }
//!
//! let container = Container::new();
//! container.using(Settings).unwrap();
//! assert_eq!(container.resolve_tagged::<u16>("port").unwrap(), 8080);
//! ```

use std::any::{Any, TypeId};

use crate::container::Container;
use crate::dependency::Dependency;
use crate::dispose::Disposable;
use crate::error::Error;
use crate::key::Key;
use crate::lifetime::{IntoLifetime, Lifetime};
use crate::registration::RegistrationToken;
use crate::runtime::Shared;

/// Installs a batch of bindings. Configurations returned by `dependencies`
/// are applied first, and each configuration type is applied once per
/// container.
pub trait Configuration: Any + Send + Sync {
    /// Identity used to apply a configuration type only once.
    fn id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn dependencies(&self) -> Vec<Box<dyn Configuration>> {
        Vec::new()
    }

    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error>;
}

/// One registration waiting to be made.
pub struct Binding {
    keys: Vec<Key>,
    dependency: Dependency,
    lifetime: Option<Shared<dyn Lifetime>>,
}

impl Binding {
    pub fn new(keys: impl IntoIterator<Item = Key>, dependency: Dependency, lifetime: impl IntoLifetime) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            dependency,
            lifetime: lifetime.into_lifetime(),
        }
    }
}

/// Registers every binding, or none: on the first failure the bindings
/// registered so far are disposed.
pub fn register_all(
    container: &Container,
    bindings: impl IntoIterator<Item = Binding>,
) -> Result<Vec<RegistrationToken>, Error> {
    let mut tokens: Vec<RegistrationToken> = Vec::new();
    for binding in bindings {
        match container.register(binding.keys, binding.dependency, binding.lifetime) {
            Ok(token) => tokens.push(token),
            Err(error) => {
                for token in tokens.iter().rev() {
                    token.dispose();
                }
                return Err(error);
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lifetime::Lifetimes;

    struct Base;

    impl Configuration for Base {
        fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
            register_all(
                container,
                vec![Binding::new([Key::of::<u8>()], Dependency::constant(1u8), Lifetimes::Transient)],
            )
        }
    }

    struct App;

    impl Configuration for App {
        fn dependencies(&self) -> Vec<Box<dyn Configuration>> {
            vec![Box::new(Base)]
        }

        fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
            let base = container.resolve::<u8>()?;
            register_all(
                container,
                vec![Binding::new(
                    [Key::of::<u16>()],
                    Dependency::constant(u16::from(base) + 1),
                    Lifetimes::Transient,
                )],
            )
        }
    }

    struct Broken;

    impl Configuration for Broken {
        fn dependencies(&self) -> Vec<Box<dyn Configuration>> {
            vec![Box::new(Base)]
        }

        fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
            register_all(
                container,
                vec![
                    Binding::new([Key::of::<u32>()], Dependency::constant(1u32), Lifetimes::Transient),
                    Binding::new([Key::of::<u8>()], Dependency::constant(2u8), Lifetimes::Transient),
                ],
            )
        }
    }

    #[test]
    fn dependencies_apply_first_and_once() {
        let container = Container::empty();
        let tokens = container
            .configure(vec![Box::new(App), Box::new(Base)])
            .unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(container.resolve::<u16>().unwrap(), 2);

        let again = container.using(Base).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn failing_configuration_rolls_back() {
        let container = Container::empty();
        let err = container.using(Broken).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CannotRegister);
        assert!(container.try_get_resolver(&Key::of::<u32>()).is_none());
        assert!(container.try_get_resolver(&Key::of::<u8>()).is_none());

        let tokens = container.using(Base).unwrap();
        assert_eq!(tokens.len(), 1);
    }
}
