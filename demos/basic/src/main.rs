use ioc::{
    All, Autowire, Binding, Configuration, Container, Dependency, Error, Func, Key, Lazy, Lifetimes,
    Parameter, RegistrationToken, Shared, TypeDescriptor, register_all,
};

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct English;

impl Greeter for English {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}")
    }
}

struct French;

impl Greeter for French {
    fn greet(&self, name: &str) -> String {
        format!("Bonjour, {name}")
    }
}

struct Session {
    greeter: Shared<dyn Greeter>,
    user: String,
}

impl Autowire for Session {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Session>()
            .constructor(
                "new",
                vec![
                    Parameter::of::<Shared<dyn Greeter>>("greeter"),
                    Parameter::of::<String>("user"),
                ],
                |args| {
                    Ok(Session {
                        greeter: args.get(0)?,
                        user: args.get(1)?,
                    })
                },
            )
            .build()
    }
}

struct Greetings;

impl Configuration for Greetings {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        let english: Shared<dyn Greeter> = Shared::new(English);
        let french: Shared<dyn Greeter> = Shared::new(French);
        register_all(
            container,
            vec![
                Binding::new(
                    [Key::of::<Shared<dyn Greeter>>()],
                    Dependency::constant(english.clone()),
                    Lifetimes::Singleton,
                ),
                Binding::new(
                    [Key::tagged::<Shared<dyn Greeter>>("en")],
                    Dependency::constant(english),
                    Lifetimes::Singleton,
                ),
                Binding::new(
                    [Key::tagged::<Shared<dyn Greeter>>("fr")],
                    Dependency::constant(french),
                    Lifetimes::Singleton,
                ),
                Binding::new(
                    [Key::of::<Shared<Session>>()],
                    Dependency::autowire::<Session>(),
                    Lifetimes::ContainerSingleton,
                ),
            ],
        )
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().init();

    let root = Container::new();
    root.using(Greetings)?;

    let request = root.create_child("request")?;
    request.register([Key::of::<String>()], Dependency::constant(String::from("Ada")), Lifetimes::Transient)?;

    let session = request.resolve::<Shared<Session>>()?;
    println!("{}", session.greeter.greet(&session.user));

    let greeters = root.resolve_generic::<All<Shared<dyn Greeter>>>()?;
    for greeter in &greeters {
        println!("{}", greeter.greet("world"));
    }

    let lazy = request.resolve_generic::<Lazy<Shared<Session>>>()?;
    println!("lazy created: {}", lazy.is_created());
    println!("same session: {}", Shared::ptr_eq(&lazy.value()?, &session));

    let names = request.resolve_generic::<Func<String>>()?;
    println!("Func<String> -> {}", names.call()?);

    println!("Container: {:?}", request);
    root.dispose();
    println!("request disposed: {}", request.is_disposed());
    Ok(())
}
