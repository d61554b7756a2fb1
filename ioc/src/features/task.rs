use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::thread::JoinHandle;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::configuration::Configuration;
use crate::container::Container;
use crate::contract::{ContractType, GenericContract, GenericDefinition, GenericParameter, Witness};
use crate::error::Error;
use crate::instance::Instance;
use crate::key::Key;
use crate::lifetime::Lifetimes;
use crate::registration::RegistrationToken;
use crate::runtime::Shared;

use super::{CallFn, Deferred, deferred};

pub const TASK: GenericDefinition = GenericDefinition {
    name: "Task",
    parameters: &[GenericParameter {
        name: "T",
        constraints: &[],
    }],
};

/// A resolution of `T` run on its own thread.
pub struct Task<T> {
    call: Shared<CallFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Clone + Send + Sync> Task<T> {
    /// Starts resolving `T` on a new thread.
    pub fn start(&self) -> TaskHandle<T> {
        #[cfg(feature = "tracing")]
        debug!("Starting task for {}", std::any::type_name::<T>());

        let call = self.call.clone();
        let handle = std::thread::spawn(move || -> Result<T, Error> { call(&[])?.downcast::<T>() });
        TaskHandle { handle }
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task<{}>", std::any::type_name::<T>())
    }
}

/// A started [`Task`].
pub struct TaskHandle<T> {
    handle: JoinHandle<Result<T, Error>>,
}

impl<T> TaskHandle<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the resolution. A panicking factory yields `TaskFailed`.
    pub fn join(self) -> Result<T, Error> {
        self.handle
            .join()
            .map_err(|_| Error::task_failed(std::any::type_name::<T>()))?
    }
}

fn build<T: Any + Clone + Send + Sync>(call: Shared<CallFn>) -> Instance {
    Instance::new(Task::<T> {
        call,
        _marker: PhantomData,
    })
}

impl<T: Any + Clone + Send + Sync> GenericContract for Task<T> {
    fn definition() -> GenericDefinition {
        TASK
    }

    fn arguments() -> Vec<ContractType> {
        vec![ContractType::of::<T>()]
    }

    fn witness() -> Option<Witness> {
        Some(Witness::new(Deferred(build::<T>)))
    }
}

pub struct TaskFeature;

impl Configuration for TaskFeature {
    fn apply(&self, container: &Container) -> Result<Vec<RegistrationToken>, Error> {
        let token = container.register([Key::open(TASK)], deferred(), Lifetimes::Transient)?;
        Ok(vec![token])
    }
}
