pub mod autowiring;
pub mod configuration;
pub mod container;
pub mod context;
pub mod contract;
pub mod dependency;
pub mod dispose;
pub mod error;
pub mod events;
pub mod features;
pub mod instance;
pub mod issues;
pub mod key;
pub mod lifetime;
pub mod plan;
pub mod reflection;
pub mod registration;
pub mod resolve_guard;
pub mod resolver;
pub mod runtime;

pub use autowiring::*;
pub use configuration::*;
pub use container::*;
pub use context::*;
pub use contract::*;
pub use dependency::*;
pub use dispose::*;
pub use error::*;
pub use events::*;
pub use features::{All, Func, Lazy, Task, TaskHandle};
pub use instance::*;
pub use issues::*;
pub use key::*;
pub use lifetime::*;
pub use plan::*;
pub use reflection::*;
pub use registration::*;
pub use resolve_guard::*;
pub use resolver::*;
pub use runtime::*;
