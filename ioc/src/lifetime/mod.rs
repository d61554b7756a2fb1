//! Lifetime policies controlling instance reuse and disposal.
//!
//! A lifetime wraps the construction logic of a binding and decides whether to
//! run it or hand back a cached instance:
//!
//! - [`Lifetimes::Transient`]: every request constructs.
//! - [`Lifetimes::Singleton`]: one instance per registration (per closed
//!   generic type for open generic registrations).
//! - [`Lifetimes::ContainerSingleton`]: one instance per requesting container.
//! - [`Lifetimes::ResolveSingleton`]: one instance per top-level resolve call.
//!
//! Lifetimes hold state, so a registration clones its template with
//! [`Lifetime::fresh`] for every independent scope instead of sharing it.
//!
//! # Examples
//!
//! ```
//! use ioc::lifetime::Lifetimes;
//!
//! assert!(Lifetimes::Singleton.is_singleton());
//! assert!(!Lifetimes::Transient.is_singleton());
//! assert_eq!(Lifetimes::ContainerSingleton.create().name(), "container-singleton");
//! ```

mod container_singleton;
mod resolve;
mod singleton;
mod transient;

use std::fmt;

use crate::context::Context;
use crate::error::Error;
use crate::instance::Instance;
use crate::runtime::Shared;

pub use container_singleton::ContainerSingletonLifetime;
pub use resolve::ResolveSingletonLifetime;
pub use singleton::SingletonLifetime;
pub use transient::TransientLifetime;

/// Construction logic a lifetime may decide to run.
pub type Factory<'f> = dyn Fn(&Context<'_>) -> Result<Instance, Error> + 'f;

/// A policy deciding whether a request constructs or reuses an instance.
pub trait Lifetime: Send + Sync {
    fn get_or_create(&self, ctx: &Context<'_>, factory: &Factory<'_>) -> Result<Instance, Error>;

    /// A new, empty lifetime of the same kind.
    fn fresh(&self) -> Shared<dyn Lifetime>;

    /// Disposes every instance this lifetime owns.
    fn dispose(&self) {}

    fn name(&self) -> &'static str;
}

/// Built-in lifetime kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifetimes {
    Transient,
    Singleton,
    ContainerSingleton,
    ResolveSingleton,
}

impl Lifetimes {
    pub fn create(self) -> Shared<dyn Lifetime> {
        match self {
            Lifetimes::Transient => Shared::new(TransientLifetime),
            Lifetimes::Singleton => Shared::new(SingletonLifetime::new()),
            Lifetimes::ContainerSingleton => Shared::new(ContainerSingletonLifetime::new()),
            Lifetimes::ResolveSingleton => Shared::new(ResolveSingletonLifetime::new()),
        }
    }

    pub fn is_singleton(self) -> bool {
        matches!(self, Lifetimes::Singleton | Lifetimes::ContainerSingleton)
    }
}

impl fmt::Display for Lifetimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetimes::Transient => write!(f, "Transient"),
            Lifetimes::Singleton => write!(f, "Singleton"),
            Lifetimes::ContainerSingleton => write!(f, "ContainerSingleton"),
            Lifetimes::ResolveSingleton => write!(f, "ResolveSingleton"),
        }
    }
}

/// Anything accepted as the lifetime of a registration.
pub trait IntoLifetime {
    fn into_lifetime(self) -> Option<Shared<dyn Lifetime>>;
}

impl IntoLifetime for Lifetimes {
    fn into_lifetime(self) -> Option<Shared<dyn Lifetime>> {
        match self {
            Lifetimes::Transient => None,
            other => Some(other.create()),
        }
    }
}

impl IntoLifetime for Shared<dyn Lifetime> {
    fn into_lifetime(self) -> Option<Shared<dyn Lifetime>> {
        Some(self)
    }
}

impl IntoLifetime for Option<Shared<dyn Lifetime>> {
    fn into_lifetime(self) -> Option<Shared<dyn Lifetime>> {
        self
    }
}
