use arc_swap::ArcSwapOption;
use parking_lot::ReentrantMutex;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::context::Context;
use crate::error::Error;
use crate::instance::Instance;
use crate::lifetime::{Factory, Lifetime};
use crate::runtime::Shared;

/// One cached instance for the whole registration.
///
/// Reads go through a lock-free snapshot. The first construction runs under a
/// lock owned by this lifetime alone, with a second check once it is held, so
/// concurrent first requests construct exactly once. The lock is reentrant so
/// a factory resolving another key of the same registration cannot deadlock
/// its own thread.
pub struct SingletonLifetime {
    instance: ArcSwapOption<Instance>,
    lock: ReentrantMutex<()>,
}

impl SingletonLifetime {
    pub fn new() -> Self {
        Self {
            instance: ArcSwapOption::empty(),
            lock: ReentrantMutex::new(()),
        }
    }

    pub fn is_created(&self) -> bool {
        self.instance.load().is_some()
    }
}

impl Default for SingletonLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime for SingletonLifetime {
    fn get_or_create(&self, ctx: &Context<'_>, factory: &Factory<'_>) -> Result<Instance, Error> {
        if let Some(instance) = self.instance.load_full() {
            return Ok((*instance).clone());
        }

        let _lock = self.lock.lock();
        if let Some(instance) = self.instance.load_full() {
            return Ok((*instance).clone());
        }

        #[cfg(feature = "tracing")]
        debug!("Creating singleton instance for {}", ctx.key());

        let created = factory(ctx)?;
        self.instance.store(Some(Shared::new(created.clone())));
        Ok(created)
    }

    fn fresh(&self) -> Shared<dyn Lifetime> {
        Shared::new(SingletonLifetime::new())
    }

    fn dispose(&self) {
        let _lock = self.lock.lock();
        if let Some(instance) = self.instance.swap(None) {
            instance.dispose();
        }
    }

    fn name(&self) -> &'static str {
        "singleton"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::context::ResolveScope;
    use crate::dispose::OnDispose;
    use crate::key::Key;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn constructs_once() {
        let container = Container::empty();
        let key = Key::of::<u32>();
        let scope = Shared::new(ResolveScope::new());
        let ctx = Context::new(&container, &key, &[], &scope);

        let lifetime = SingletonLifetime::new();
        let calls = AtomicUsize::new(0);
        let factory = |_: &Context<'_>| -> Result<Instance, Error> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Instance::new(1u32))
        };

        let first = lifetime.get_or_create(&ctx, &factory).unwrap();
        let second = lifetime.get_or_create(&ctx, &factory).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lifetime.is_created());
    }

    #[test]
    fn failed_construction_is_not_cached() {
        let container = Container::empty();
        let key = Key::of::<u32>();
        let scope = Shared::new(ResolveScope::new());
        let ctx = Context::new(&container, &key, &[], &scope);

        let lifetime = SingletonLifetime::new();
        let failing = |_: &Context<'_>| -> Result<Instance, Error> { Err(Error::type_mismatch("u32")) };
        assert!(lifetime.get_or_create(&ctx, &failing).is_err());
        assert!(!lifetime.is_created());
    }

    #[test]
    fn dispose_releases_instance_once() {
        let container = Container::empty();
        let key = Key::of::<u32>();
        let scope = Shared::new(ResolveScope::new());
        let ctx = Context::new(&container, &key, &[], &scope);

        let disposed = Shared::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let lifetime = SingletonLifetime::new();
        let factory = move |_: &Context<'_>| -> Result<Instance, Error> {
            let counter = counter.clone();
            Ok(Instance::new(1u32).with_disposer(Shared::new(OnDispose::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))))
        };

        lifetime.get_or_create(&ctx, &factory).unwrap();
        lifetime.dispose();
        lifetime.dispose();
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert!(!lifetime.is_created());
    }
}
