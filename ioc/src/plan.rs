//! Two-phase compilation of autowiring recipes.
//!
//! Phase one turns a recipe into a [`ConstructionPlan`]: pure data naming the
//! chosen constructor and initializers and where each of their parameters
//! comes from. Phase two lowers the plan into a resolver closure, fetching
//! every dependency resolver up front so that a missing dependency fails the
//! compilation before any instance is built.

use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::autowiring::{AutowiringStrategy, Candidate, DefaultAutowiringStrategy};
use crate::container::Container;
use crate::context::Context;
use crate::contract::ContractType;
use crate::dependency::{Autowiring, Target};
use crate::error::{Error, ErrorKind};
use crate::instance::Instance;
use crate::key::Key;
use crate::reflection::{Arguments, Parameter, TypeDescriptor};
use crate::resolver::{ResolveFn, Resolver};
use crate::runtime::Shared;

/// Where a parameter value comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterSource {
    /// Positional resolve argument.
    Argument(usize),
    /// Resolved from the container.
    Dependency(Key),
}

/// One constructor or initializer call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub name: &'static str,
    pub index: usize,
    pub sources: Vec<ParameterSource>,
}

#[derive(Clone, Debug)]
pub struct ConstructionPlan {
    pub type_name: &'static str,
    pub target: ContractType,
    pub constructor: Call,
    pub initializers: Vec<Call>,
}

enum Input {
    Argument { index: usize, contract: ContractType },
    Resolver(Resolver),
}

pub(crate) struct Planner<'a> {
    container: &'a Container,
    key: &'a Key,
    autowiring: &'a Autowiring,
    resolved: HashMap<Key, Resolver>,
}

impl<'a> Planner<'a> {
    pub(crate) fn new(container: &'a Container, key: &'a Key, autowiring: &'a Autowiring) -> Self {
        Self {
            container,
            key,
            autowiring,
            resolved: HashMap::new(),
        }
    }

    fn strategy(&self) -> Shared<dyn AutowiringStrategy> {
        match self.autowiring.custom_strategy() {
            Some(strategy) => strategy.clone(),
            None => self.container.autowiring_strategy(),
        }
    }

    fn descriptor(&self, strategy: &dyn AutowiringStrategy) -> Result<TypeDescriptor, Error> {
        let implementation = match self.autowiring.target() {
            Target::Type(descriptor) => return Ok(descriptor.clone()),
            Target::Generic(implementation) => implementation,
        };

        let requested = self.key.contract();
        let definition = implementation.definition();
        let arguments = match strategy
            .resolve_generic_arguments(&definition, requested)
            .or_else(|| DefaultAutowiringStrategy.resolve_generic_arguments(&definition, requested))
        {
            Some(arguments) => arguments,
            None => self
                .container
                .issues()
                .cannot_resolve_generic_constraints(&definition, requested)?,
        };

        implementation
            .descriptor(&arguments)
            .ok_or_else(|| Error::cannot_resolve_type(&definition.to_string(), &requested.to_string()))
    }

    fn sources(&self, parameters: &[Parameter]) -> Vec<ParameterSource> {
        parameters
            .iter()
            .map(|parameter| match self.autowiring.argument_index(parameter.name) {
                Some(index) => ParameterSource::Argument(index),
                None => {
                    let tag = self
                        .autowiring
                        .tag_for(parameter.name)
                        .cloned()
                        .or_else(|| parameter.tag.clone());
                    ParameterSource::Dependency(Key::new(parameter.contract.clone(), tag))
                }
            })
            .collect()
    }

    /// Whether every dependency in `sources` resolves in the requesting
    /// container. Only cycles abort the search; any other failure just makes
    /// the candidate ineligible.
    fn is_resolvable(&mut self, sources: &[ParameterSource]) -> Result<bool, Error> {
        for source in sources {
            let ParameterSource::Dependency(key) = source else {
                continue;
            };
            if self.resolved.contains_key(key) {
                continue;
            }
            match self.container.lookup(key, self.container) {
                Ok(Some(resolver)) => {
                    self.resolved.insert(key.clone(), resolver);
                }
                Ok(None) => return Ok(false),
                Err(error) if error.kind == ErrorKind::CircularDependency => return Err(error),
                Err(_) => return Ok(false),
            }
        }
        Ok(true)
    }

    pub(crate) fn plan(&mut self) -> Result<(TypeDescriptor, ConstructionPlan), Error> {
        let strategy = self.strategy();
        let descriptor = self.descriptor(strategy.as_ref())?;
        let target = self.key.contract().clone();

        if !descriptor.can_serve(&target) {
            return Err(Error::type_mismatch(&format!(
                "{} cannot be served as {}",
                descriptor.name(),
                target
            )));
        }

        let constructor_sources: Vec<Vec<ParameterSource>> = descriptor
            .constructors()
            .iter()
            .map(|constructor| self.sources(&constructor.parameters))
            .collect();
        let mut candidates = Vec::with_capacity(constructor_sources.len());
        for (index, (constructor, sources)) in descriptor
            .constructors()
            .iter()
            .zip(&constructor_sources)
            .enumerate()
        {
            candidates.push(Candidate {
                index,
                name: constructor.name,
                parameters: constructor.parameters.len(),
                resolvable: self.is_resolvable(sources)?,
                requested: false,
                autowired: false,
            });
        }

        let chosen = match strategy
            .select_constructor(&descriptor, &candidates)
            .or_else(|| DefaultAutowiringStrategy.select_constructor(&descriptor, &candidates))
        {
            Some(index) => index,
            None => self.container.issues().cannot_find_constructor(&descriptor)?,
        };
        let (constructor, sources) = descriptor
            .constructors()
            .get(chosen)
            .zip(constructor_sources.get(chosen))
            .ok_or_else(|| Error::cannot_find_constructor(descriptor.name()))?;
        let constructor = Call {
            name: constructor.name,
            index: chosen,
            sources: sources.clone(),
        };

        let method_sources: Vec<Vec<ParameterSource>> = descriptor
            .methods()
            .iter()
            .map(|method| self.sources(&method.parameters))
            .collect();
        let mut candidates = Vec::with_capacity(method_sources.len());
        for (index, (method, sources)) in descriptor.methods().iter().zip(&method_sources).enumerate() {
            candidates.push(Candidate {
                index,
                name: method.name,
                parameters: method.parameters.len(),
                resolvable: self.is_resolvable(sources)?,
                requested: self.autowiring.requests_initializer(method.name),
                autowired: method.autowired,
            });
        }

        let selected = strategy
            .select_initializers(&descriptor, &candidates)
            .or_else(|| DefaultAutowiringStrategy.select_initializers(&descriptor, &candidates))
            .unwrap_or_default();
        let initializers = selected
            .into_iter()
            .filter_map(|index| {
                let method = descriptor.methods().get(index)?;
                Some(Call {
                    name: method.name,
                    index,
                    sources: method_sources.get(index)?.clone(),
                })
            })
            .collect();

        let plan = ConstructionPlan {
            type_name: descriptor.name(),
            target,
            constructor,
            initializers,
        };
        Ok((descriptor, plan))
    }

    fn lower(&self, call: &Call, parameters: &[Parameter]) -> Result<Vec<Input>, Error> {
        call.sources
            .iter()
            .zip(parameters)
            .map(|(source, parameter)| match source {
                ParameterSource::Argument(index) => Ok(Input::Argument {
                    index: *index,
                    contract: parameter.contract.clone(),
                }),
                ParameterSource::Dependency(key) => match self.resolved.get(key) {
                    Some(resolver) => Ok(Input::Resolver(resolver.clone())),
                    None => self.container.get_resolver(key).map(Input::Resolver),
                },
            })
            .collect()
    }

    pub(crate) fn compile(mut self) -> Result<Shared<ResolveFn>, Error> {
        let (descriptor, plan) = self.plan()?;

        let constructor = descriptor
            .constructors()
            .get(plan.constructor.index)
            .cloned()
            .ok_or_else(|| Error::cannot_find_constructor(descriptor.name()))?;
        let constructor_inputs = self.lower(&plan.constructor, &constructor.parameters)?;

        let mut initializers = Vec::with_capacity(plan.initializers.len());
        for call in &plan.initializers {
            let method = descriptor
                .methods()
                .get(call.index)
                .cloned()
                .ok_or_else(|| Error::type_mismatch(call.name))?;
            let inputs = self.lower(call, &method.parameters)?;
            initializers.push((method, inputs));
        }

        #[cfg(feature = "tracing")]
        debug!(
            "Compiled {} for {} with constructor {} and {} initializer(s)",
            plan.type_name,
            plan.target,
            plan.constructor.name,
            initializers.len()
        );

        let target = plan.target;
        let resolve: Shared<ResolveFn> = Shared::new(move |ctx: &Context<'_>| -> Result<Instance, Error> {
            let arguments = collect(&constructor_inputs, ctx)?;
            let mut value = constructor.construct(&arguments)?;
            for (method, inputs) in &initializers {
                let arguments = collect(inputs, ctx)?;
                method.invoke(&mut *value, &arguments)?;
            }
            descriptor.cast(value, &target)
        });
        Ok(resolve)
    }
}

fn collect(inputs: &[Input], ctx: &Context<'_>) -> Result<Arguments, Error> {
    let mut values = Vec::with_capacity(inputs.len());
    for input in inputs {
        let value = match input {
            Input::Argument { index, contract } => ctx
                .args()
                .get(*index)
                .cloned()
                .ok_or_else(|| Error::missing_argument(*index, &contract.to_string()))?,
            Input::Resolver(resolver) => resolver.resolve_in(ctx.container(), &[], ctx.scope())?,
        };
        values.push(value);
    }
    Ok(Arguments::new(values))
}
