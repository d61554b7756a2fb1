use crate::autowiring::{AutowiringStrategy, DefaultAutowiringStrategy};
use crate::configuration::{Binding, Configuration, register_all};
use crate::container::Container;
use crate::dependency::Dependency;
use crate::error::Error;
use crate::issues::{DefaultIssueResolver, IssueResolver};
use crate::key::Key;
use crate::lifetime::Lifetimes;
use crate::registration::RegistrationToken;
use crate::runtime::Shared;

/// Tag under which a container resolves its parent.
pub const PARENT: &str = "parent";

/// Tag under which a container resolves a new child of itself.
pub const CHILD: &str = "child";

/// Well-known bindings: the resolving container itself, its parent, a new
/// child, and the default issue resolver and autowiring strategy.
///
/// Override the collaborators in a child container, or start from
/// [`Container::empty`] to bind them at the root.
pub struct CoreFeature;

impl Configuration for CoreFeature {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        let issues: Shared<dyn IssueResolver> = Shared::new(DefaultIssueResolver);
        let strategy: Shared<dyn AutowiringStrategy> = Shared::new(DefaultAutowiringStrategy);

        register_all(
            container,
            vec![
                Binding::new(
                    [Key::of::<Container>()],
                    Dependency::factory(|ctx| Ok(ctx.container().clone())),
                    Lifetimes::Transient,
                ),
                Binding::new(
                    [Key::tagged::<Container>(PARENT)],
                    Dependency::factory(|ctx| {
                        ctx.container()
                            .parent()
                            .cloned()
                            .ok_or_else(|| Error::cannot_resolve(ctx.container().name(), &ctx.key().to_string()))
                    }),
                    Lifetimes::Transient,
                ),
                Binding::new(
                    [Key::tagged::<Container>(CHILD)],
                    Dependency::factory(|ctx| ctx.container().child()),
                    Lifetimes::Transient,
                ),
                Binding::new(
                    [Key::of::<Shared<dyn IssueResolver>>()],
                    Dependency::constant(issues),
                    Lifetimes::Transient,
                ),
                Binding::new(
                    [Key::of::<Shared<dyn AutowiringStrategy>>()],
                    Dependency::constant(strategy),
                    Lifetimes::Transient,
                ),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn containers_resolve_themselves_and_relatives() {
        let root = Container::new();
        let child = root.create_child("child").unwrap();

        assert!(child.resolve::<Container>().unwrap().ptr_eq(&child));
        assert!(child.resolve_tagged::<Container>(PARENT).unwrap().ptr_eq(&root));

        let grandchild = child.resolve_tagged::<Container>(CHILD).unwrap();
        assert!(grandchild.parent().unwrap().ptr_eq(&child));

        let err = root.resolve_tagged::<Container>(PARENT).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CannotResolve);
    }

    #[test]
    fn collaborators_are_bound() {
        let root = Container::new();
        assert!(root.try_get_resolver(&Key::of::<Shared<dyn IssueResolver>>()).is_some());
        assert!(root.try_get_resolver(&Key::of::<Shared<dyn AutowiringStrategy>>()).is_some());
    }
}
