//! Error types for the IoC container.
//!
//! Registration, resolver compilation, resolution and disposal all fail with
//! an [`Error`]: an [`ErrorKind`] to match on plus a message naming the keys
//! and containers involved.
//!
//! Every failure in the container is local and recoverable by the caller. The
//! helpers in `Error` keep call sites concise and messages consistent.
//!
//! With the `tracing` feature every error is logged at `error` level as it is
//! built.
//!
//! # Examples
//!
//! ```
//! use ioc::error::{Error, ErrorKind};
//!
//! let err = Error::cannot_resolve("root", "MyService");
//! assert_eq!(err.kind, ErrorKind::CannotResolve);
//! assert!(err.message.contains("MyService"));
//! ```

use core::fmt;

#[cfg(feature = "tracing")]
use tracing::error;

/// Error categories for the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// One of the keys of a registration is already bound in the container.
    CannotRegister,
    /// No container in the ancestor chain has a binding for the key.
    CannotResolve,
    /// No eligible constructor was found while autowiring a type.
    CannotFindConstructor,
    /// An open generic implementation could not be unified with the request.
    CannotResolveGenericConstraints,
    /// The unified generic arguments have no declared instantiation.
    CannotResolveType,
    /// A positional argument required by the resolver was not supplied.
    MissingArgument,
    /// A value could not be converted to the requested type.
    TypeMismatch,
    /// Circular dependency detected in the resolution chain.
    CircularDependency,
    /// The container has already been disposed.
    ContainerDisposed,
    /// A deferred resolution running on its own thread did not complete.
    TaskFailed,
}

/// Container error structure.
///
/// `kind` enables programmatic handling, while `message` is human-readable.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// If the `tracing` feature is enabled, the error is automatically logged.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self {
            kind,
            message: message.into(),
        };

        #[cfg(feature = "tracing")]
        error!("{}", error);

        error
    }

    /// One or more keys collide with bindings already present in the container.
    pub fn cannot_register(container: &str, keys: &str) -> Self {
        Self::new(
            ErrorKind::CannotRegister,
            format!(
                "Keys [{}] are already registered in container {}",
                keys, container
            ),
        )
    }

    /// Nothing in the container hierarchy can serve the key.
    pub fn cannot_resolve(container: &str, key: &str) -> Self {
        Self::new(
            ErrorKind::CannotResolve,
            format!("No binding for {} in container {} or its parents", key, container),
        )
    }

    /// Autowiring found no constructor it could use.
    pub fn cannot_find_constructor(type_name: &str) -> Self {
        Self::new(
            ErrorKind::CannotFindConstructor,
            format!("No resolvable constructor found for type: {}", type_name),
        )
    }

    /// The implementation's generic parameters cannot be bound from the request.
    pub fn cannot_resolve_generic_constraints(implementation: &str, requested: &str) -> Self {
        Self::new(
            ErrorKind::CannotResolveGenericConstraints,
            format!(
                "Generic parameters of {} cannot be bound from {}",
                implementation, requested
            ),
        )
    }

    /// The implementation was unified but has no matching closed instantiation.
    pub fn cannot_resolve_type(implementation: &str, requested: &str) -> Self {
        Self::new(
            ErrorKind::CannotResolveType,
            format!(
                "Implementation {} has no instantiation serving {}",
                implementation, requested
            ),
        )
    }

    /// A positional argument was requested but not supplied.
    pub fn missing_argument(index: usize, type_name: &str) -> Self {
        Self::new(
            ErrorKind::MissingArgument,
            format!("Argument #{} of type {} was not supplied", index, type_name),
        )
    }

    /// Type mismatch during downcast or contract conversion.
    pub fn type_mismatch(type_name: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("Type mismatch when resolving: {}", type_name),
        )
    }

    /// Circular dependency detected in resolution chain.
    pub fn circular_dependency(dependency_chain: &[&str]) -> Self {
        Self::new(
            ErrorKind::CircularDependency,
            format!(
                "Circular dependency detected: {}",
                dependency_chain.join(" -> ")
            ),
        )
    }

    /// The container was used after `dispose()`.
    pub fn container_disposed(container: &str) -> Self {
        Self::new(
            ErrorKind::ContainerDisposed,
            format!("Container {} has been disposed", container),
        )
    }

    /// A task thread panicked before producing its value.
    pub fn task_failed(type_name: &str) -> Self {
        Self::new(
            ErrorKind::TaskFailed,
            format!("Task resolving {} did not complete", type_name),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}) - {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}
