use std::collections::HashMap;

use parking_lot::ReentrantMutex;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::context::Context;
use crate::dispose::OnDispose;
use crate::error::Error;
use crate::instance::Instance;
use crate::lifetime::{Factory, Lifetime};
use crate::runtime::{Shared, Store};

/// One cached instance per requesting container.
///
/// The first instance created for a container is registered as a resource of
/// that container, so it is disposed when the container is, even if the
/// registration lives in an ancestor. Whichever side removes the instance from
/// the map disposes it, which keeps disposal to exactly once.
pub struct ContainerSingletonLifetime {
    instances: Shared<Store<HashMap<u64, Instance>>>,
    lock: ReentrantMutex<()>,
}

impl ContainerSingletonLifetime {
    pub fn new() -> Self {
        Self {
            instances: Shared::new(Store::new(HashMap::new())),
            lock: ReentrantMutex::new(()),
        }
    }

    /// Number of containers currently holding an instance.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

impl Default for ContainerSingletonLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime for ContainerSingletonLifetime {
    fn get_or_create(&self, ctx: &Context<'_>, factory: &Factory<'_>) -> Result<Instance, Error> {
        let container = ctx.container();
        let id = container.id();

        if let Some(instance) = self.instances.read().get(&id).cloned() {
            return Ok(instance);
        }

        let _lock = self.lock.lock();
        if let Some(instance) = self.instances.read().get(&id).cloned() {
            return Ok(instance);
        }

        #[cfg(feature = "tracing")]
        debug!(
            "Creating container singleton instance for {} in {}",
            ctx.key(),
            container.name()
        );

        let created = factory(ctx)?;
        self.instances.write().insert(id, created.clone());

        let instances = Shared::downgrade(&self.instances);
        container.register_resource(OnDispose::new(move || {
            if let Some(instances) = instances.upgrade() {
                let removed = instances.write().remove(&id);
                if let Some(instance) = removed {
                    instance.dispose();
                }
            }
        }));

        Ok(created)
    }

    fn fresh(&self) -> Shared<dyn Lifetime> {
        Shared::new(ContainerSingletonLifetime::new())
    }

    fn dispose(&self) {
        let _lock = self.lock.lock();
        let drained: Vec<Instance> = self.instances.write().drain().map(|(_, v)| v).collect();
        for instance in drained {
            instance.dispose();
        }
    }

    fn name(&self) -> &'static str {
        "container-singleton"
    }
}
