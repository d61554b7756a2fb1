use crate::context::Context;
use crate::error::Error;
use crate::instance::Instance;
use crate::lifetime::{Factory, Lifetime};
use crate::runtime::Shared;

/// Constructs on every request and owns nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransientLifetime;

impl Lifetime for TransientLifetime {
    fn get_or_create(&self, ctx: &Context<'_>, factory: &Factory<'_>) -> Result<Instance, Error> {
        factory(ctx)
    }

    fn fresh(&self) -> Shared<dyn Lifetime> {
        Shared::new(TransientLifetime)
    }

    fn name(&self) -> &'static str {
        "transient"
    }
}
