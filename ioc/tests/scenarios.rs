use std::sync::atomic::{AtomicUsize, Ordering};

use ioc::{
    All, Autowire, Autowiring, Container, ContractType, Dependency, GenericDefinition,
    GenericImplementation, GenericInterface, GenericParameter, Key, Lifetimes, Parameter, Shared,
    TypeDescriptor,
};

static REPOSITORIES: AtomicUsize = AtomicUsize::new(0);

trait IRepository: Send + Sync {
    fn id(&self) -> usize;
}

struct Repository {
    id: usize,
}

impl IRepository for Repository {
    fn id(&self) -> usize {
        self.id
    }
}

impl Autowire for Repository {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Repository>()
            .constructor("new", vec![], |_| {
                Ok(Repository {
                    id: REPOSITORIES.fetch_add(1, Ordering::SeqCst),
                })
            })
            .implements::<Shared<dyn IRepository>, _>(|r| Shared::new(r) as Shared<dyn IRepository>)
            .build()
    }
}

trait IService: Send + Sync {
    fn repository(&self) -> &Shared<dyn IRepository>;
}

struct Service {
    repository: Shared<dyn IRepository>,
}

impl IService for Service {
    fn repository(&self) -> &Shared<dyn IRepository> {
        &self.repository
    }
}

impl Autowire for Service {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Service>()
            .constructor(
                "new",
                vec![Parameter::of::<Shared<dyn IRepository>>("repository")],
                |args| {
                    Ok(Service {
                        repository: args.get(0)?,
                    })
                },
            )
            .implements::<Shared<dyn IService>, _>(|s| Shared::new(s) as Shared<dyn IService>)
            .build()
    }
}

fn container(service: Lifetimes) -> Container {
    let container = Container::new();
    container
        .register(
            [Key::of::<Shared<dyn IRepository>>()],
            Dependency::autowire::<Repository>(),
            Lifetimes::Transient,
        )
        .unwrap();
    container
        .register(
            [Key::of::<Shared<dyn IService>>()],
            Dependency::autowire::<Service>(),
            service,
        )
        .unwrap();
    container
}

#[test]
fn transient_services_get_fresh_dependencies() {
    let container = container(Lifetimes::Transient);

    let a = container.resolve::<Shared<dyn IService>>().unwrap();
    let b = container.resolve::<Shared<dyn IService>>().unwrap();

    assert!(!Shared::ptr_eq(&a, &b));
    assert!(!Shared::ptr_eq(a.repository(), b.repository()));
    assert_ne!(a.repository().id(), b.repository().id());
}

#[test]
fn singletons_are_shared_with_children() {
    let root = container(Lifetimes::Singleton);
    let child = root.create_child("child").unwrap();

    let a = root.resolve::<Shared<dyn IService>>().unwrap();
    let b = child.resolve::<Shared<dyn IService>>().unwrap();
    assert!(Shared::ptr_eq(&a, &b));
}

#[test]
fn container_singletons_are_per_container() {
    let root = container(Lifetimes::ContainerSingleton);

    let root_a = root.resolve::<Shared<dyn IService>>().unwrap();
    let root_b = root.resolve::<Shared<dyn IService>>().unwrap();
    assert!(Shared::ptr_eq(&root_a, &root_b));

    let child = root.create_child("child").unwrap();
    let child_a = child.resolve::<Shared<dyn IService>>().unwrap();
    let child_b = child.resolve::<Shared<dyn IService>>().unwrap();
    assert!(Shared::ptr_eq(&child_a, &child_b));
    assert!(!Shared::ptr_eq(&root_a, &child_a));
}

#[test]
fn tagged_bindings_are_collected() {
    let container = Container::new();
    container
        .register(
            [Key::of::<Shared<dyn IRepository>>()],
            Dependency::autowire::<Repository>(),
            Lifetimes::Transient,
        )
        .unwrap();
    container
        .register(
            [Key::tagged::<Shared<dyn IService>>(1)],
            Dependency::autowire::<Service>(),
            Lifetimes::Transient,
        )
        .unwrap();
    container
        .register(
            [Key::tagged::<Shared<dyn IService>>(2)],
            Dependency::autowire::<Service>(),
            Lifetimes::Transient,
        )
        .unwrap();
    container
        .register(
            [Key::tagged::<Shared<dyn IService>>("abc")],
            Dependency::autowire::<Service>(),
            Lifetimes::Transient,
        )
        .unwrap();

    let services = container.resolve_generic::<All<Shared<dyn IService>>>().unwrap();
    assert_eq!(services.len(), 3);
}

trait IRepo<T>: Send + Sync {
    fn describe(&self) -> String;
}

const IREPO: GenericDefinition = GenericDefinition {
    name: "IRepo",
    parameters: &[GenericParameter {
        name: "T",
        constraints: &[],
    }],
};

impl<T: 'static> GenericInterface for dyn IRepo<T> {
    fn definition() -> GenericDefinition {
        IREPO
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<T>()]
    }
}

struct Repo<T> {
    items: Vec<T>,
}

impl<T: Send + Sync + 'static> IRepo<T> for Repo<T> {
    fn describe(&self) -> String {
        format!("Repo<{}>[{}]", std::any::type_name::<T>(), self.items.len())
    }
}

const REPO: GenericDefinition = GenericDefinition {
    name: "Repo",
    parameters: &[GenericParameter {
        name: "T",
        constraints: &[],
    }],
};

fn repo_descriptor<T: Send + Sync + 'static>() -> TypeDescriptor {
    TypeDescriptor::of::<Repo<T>>()
        .constructor("new", vec![], |_| Ok(Repo { items: Vec::new() }))
        .implements::<Shared<dyn IRepo<T>>, _>(|r| Shared::new(r) as Shared<dyn IRepo<T>>)
        .build()
}

#[test]
fn open_generic_serves_each_closed_type() {
    let container = Container::new();
    container
        .register(
            [Key::open(IREPO)],
            Dependency::autowiring(Autowiring::generic(
                GenericImplementation::new(REPO)
                    .instantiation(vec![ContractType::of::<i32>()], repo_descriptor::<i32>)
                    .instantiation(vec![ContractType::of::<String>()], repo_descriptor::<String>),
            )),
            Lifetimes::Singleton,
        )
        .unwrap();

    let ints = container.resolve_generic::<Shared<dyn IRepo<i32>>>().unwrap();
    let texts = container.resolve_generic::<Shared<dyn IRepo<String>>>().unwrap();
    assert_eq!(ints.describe(), "Repo<i32>[0]");
    assert_eq!(texts.describe(), "Repo<alloc::string::String>[0]");

    let again = container.resolve_generic::<Shared<dyn IRepo<i32>>>().unwrap();
    assert!(Shared::ptr_eq(&ints, &again));
}
