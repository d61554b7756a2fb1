use crate::context::Context;
use crate::error::Error;
use crate::instance::Instance;
use crate::lifetime::{Factory, Lifetime};
use crate::runtime::{Shared, next_id};

/// One instance per top-level resolve call.
///
/// The instance lives in the call's [`ResolveScope`](crate::context::ResolveScope)
/// under this lifetime's slot and is never disposed by the container.
pub struct ResolveSingletonLifetime {
    slot: u64,
}

impl ResolveSingletonLifetime {
    pub fn new() -> Self {
        Self { slot: next_id() }
    }
}

impl Default for ResolveSingletonLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime for ResolveSingletonLifetime {
    fn get_or_create(&self, ctx: &Context<'_>, factory: &Factory<'_>) -> Result<Instance, Error> {
        if let Some(instance) = ctx.scope().get(self.slot) {
            return Ok(instance);
        }

        let created = factory(ctx)?;
        Ok(ctx.scope().insert_or_get(self.slot, created))
    }

    fn fresh(&self) -> Shared<dyn Lifetime> {
        Shared::new(ResolveSingletonLifetime::new())
    }

    fn name(&self) -> &'static str {
        "resolve-singleton"
    }
}
