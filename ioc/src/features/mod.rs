//! Built-in bindings installed by [`Container::new`](crate::Container::new).
//!
//! Apart from [`CoreFeature`], every feature binds an open generic wrapper
//! shape such as `Func<T>` or `All<T>`. The wrapper's closed contract carries
//! a witness, so one type-erased factory can build the exact Rust wrapper type
//! for whatever `T` is requested.
//!
//! ```
//! use ioc::{Container, Dependency, Key, Lifetimes};
//! use ioc::features::{All, Func, Lazy};
//!
//! let container = Container::new();
//! container.register([Key::tagged::<u32>(1)], Dependency::constant(1u32), Lifetimes::Transient).unwrap();
//! container.register([Key::tagged::<u32>(2)], Dependency::constant(2u32), Lifetimes::Transient).unwrap();
//! container.register([Key::of::<u32>()], Dependency::constant(0u32), Lifetimes::Transient).unwrap();
//!
//! let all = container.resolve_generic::<All<u32>>().unwrap();
//! assert_eq!(all.len(), 3);
//!
//! let func = container.resolve_generic::<Func<u32>>().unwrap();
//! assert_eq!(func.call().unwrap(), 0);
//!
//! let lazy = container.resolve_generic::<Lazy<u32>>().unwrap();
//! assert_eq!(lazy.value().unwrap(), 0);
//! ```

mod builtin;
mod collection;
mod func;
mod lazy;
mod task;
mod tuple;

use std::any::Any;

use crate::configuration::Configuration;
use crate::context::Context;
use crate::dependency::Dependency;
use crate::error::Error;
use crate::instance::Instance;
use crate::key::Key;
use crate::runtime::Shared;

pub use builtin::{CHILD, CoreFeature, PARENT};
pub use collection::{ALL, All, CollectionFeature};
pub use func::{FUNC, Func, FuncFeature};
pub use lazy::{LAZY, Lazy, LazyFeature};
pub use task::{TASK, Task, TaskFeature, TaskHandle};
pub use tuple::{PAIR, TRIPLE, TupleFeature};

/// Type-erased call resolving one key with positional arguments.
pub type CallFn = dyn Fn(&[Instance]) -> Result<Instance, Error> + Send + Sync;

/// Witness of wrappers that resolve later: builds the wrapper around a call.
pub struct Deferred(pub fn(Shared<CallFn>) -> Instance);

/// Witness of wrappers resolved eagerly: builds the wrapper from the
/// resolved parts, in argument order.
pub struct Composed(pub fn(Vec<Instance>) -> Result<Instance, Error>);

/// Every built-in feature, in installation order.
pub fn defaults() -> Vec<Box<dyn Configuration>> {
    vec![
        Box::new(CoreFeature),
        Box::new(FuncFeature),
        Box::new(LazyFeature),
        Box::new(TaskFeature),
        Box::new(CollectionFeature),
        Box::new(TupleFeature),
    ]
}

fn witness<'a, W: Any>(ctx: &Context<'a>) -> Result<&'a W, Error> {
    ctx.key()
        .contract()
        .witness()
        .and_then(|witness| witness.downcast_ref::<W>())
        .ok_or_else(|| Error::type_mismatch(&ctx.key().to_string()))
}

/// Key of type argument `index`, carrying the tag of the request.
fn element(ctx: &Context<'_>, index: usize) -> Result<Key, Error> {
    ctx.key()
        .contract()
        .generic_arguments()
        .get(index)
        .map(|contract| Key::new(contract.clone(), ctx.key().tag().cloned()))
        .ok_or_else(|| Error::type_mismatch(&ctx.key().to_string()))
}

/// Factory of [`Deferred`] wrappers. The call resolves through the
/// requesting container each time it runs.
fn deferred() -> Dependency {
    Dependency::instance_factory(|ctx| {
        let build = witness::<Deferred>(ctx)?.0;
        let inner = element(ctx, 0)?;
        let container = ctx.container().clone();
        let call: Shared<CallFn> = Shared::new(move |args: &[Instance]| container.resolve_key(&inner, args));
        Ok(build(call))
    })
}

/// Factory of [`Composed`] wrappers over the type arguments of the request.
fn composed() -> Dependency {
    Dependency::instance_factory(|ctx| {
        let compose = witness::<Composed>(ctx)?.0;
        let arity = ctx.key().contract().generic_arguments().len();
        let mut parts = Vec::with_capacity(arity);
        for index in 0..arity {
            parts.push(ctx.inject_key(&element(ctx, index)?)?);
        }
        compose(parts)
    })
}

fn part<T: Any + Clone>(parts: &[Instance], index: usize) -> Result<T, Error> {
    parts
        .get(index)
        .ok_or_else(|| Error::missing_argument(index, std::any::type_name::<T>()))?
        .downcast::<T>()
}
