//! Constructor injection with greedy-satisfiability selection.
//!
//! Among the declared constructors, the one with the largest fully
//! satisfiable argument list wins. Two satisfiable constructors of the same
//! arity are a conflict. The winning choice is remembered so later
//! resolutions of the same adapter skip the probe.

use std::any::Any;

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::ContainerError;
use crate::injector::{DependencyRequest, Injector, ResolutionContext};
use crate::key::ComponentKey;
use crate::parameters::{fetch, locate, Parameter, Resolved};
use crate::spec::{Args, ComponentSpec};

pub struct ConstructorInjector {
    chosen: Mutex<Option<usize>>,
}

impl ConstructorInjector {
    pub fn new() -> Self {
        Self {
            chosen: Mutex::new(None),
        }
    }

    /// Constructor indices eligible under the supplied parameters, greediest
    /// first; declaration order breaks ties.
    fn candidates(
        &self,
        spec: &ComponentSpec,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<Vec<usize>, ContainerError> {
        let ctors = spec.constructors();

        if params.len() == 1 && matches!(params[0], Parameter::DefaultConstructor) {
            return match ctors.iter().position(|ctor| ctor.slots().is_empty()) {
                Some(index) => Ok(vec![index]),
                None => Err(ContainerError::composition(
                    requester_key(ctx),
                    "the zero-argument marker was given but no zero-argument constructor is declared",
                )),
            };
        }

        let mut indices: Vec<usize> = if params.is_empty() {
            (0..ctors.len()).collect()
        } else {
            (0..ctors.len())
                .filter(|&index| ctors[index].slots().len() == params.len())
                .collect()
        };
        if indices.is_empty() {
            return Err(ContainerError::composition(
                requester_key(ctx),
                format!(
                    "{} supplied parameter(s) do not match any declared constructor",
                    params.len()
                ),
            ));
        }
        indices.sort_by(|&a, &b| ctors[b].slots().len().cmp(&ctors[a].slots().len()));
        Ok(indices)
    }

    /// Probe one constructor: locate every slot without instantiating.
    fn probe(
        &self,
        spec: &ComponentSpec,
        index: usize,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<Result<Vec<Resolved>, ContainerError>, ContainerError> {
        let ctor = &spec.constructors()[index];
        let mut located = Vec::with_capacity(ctor.slots().len());
        for (position, slot) in ctor.slots().iter().enumerate() {
            let default;
            let param = match params.get(position) {
                Some(explicit) => explicit,
                None => {
                    default = Parameter::default_for(slot);
                    &default
                }
            };
            match locate(param, slot, ctx) {
                Ok(resolved) => located.push(resolved),
                // A missing provider just disqualifies this constructor;
                // ambiguity and composition problems propagate immediately.
                Err(miss @ ContainerError::Unsatisfiable { .. })
                | Err(miss @ ContainerError::NoSuchComponent { .. }) => {
                    return Ok(Err(miss));
                }
                Err(other) => return Err(other),
            }
        }
        Ok(Ok(located))
    }

    fn select(
        &self,
        spec: &ComponentSpec,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<(usize, Vec<Resolved>), ContainerError> {
        if let Some(index) = *self.chosen.lock() {
            match self.probe(spec, index, params, ctx)? {
                Ok(located) => return Ok((index, located)),
                Err(miss) => return Err(miss),
            }
        }

        let mut best: Option<(usize, Vec<Resolved>)> = None;
        let mut first_miss: Option<ContainerError> = None;

        for index in self.candidates(spec, params, ctx)? {
            let arity = spec.constructors()[index].slots().len();
            if let Some((best_index, _)) = &best {
                let best_arity = spec.constructors()[*best_index].slots().len();
                if best_arity > arity {
                    // candidates are sorted greediest first
                    break;
                }
            }
            match self.probe(spec, index, params, ctx)? {
                Ok(located) => {
                    if best.is_some() {
                        return Err(ContainerError::composition(
                            requester_key(ctx),
                            format!(
                                "two satisfiable constructors with {arity} argument(s) for '{}'",
                                spec.impl_type()
                            ),
                        ));
                    }
                    best = Some((index, located));
                }
                Err(miss) => {
                    first_miss.get_or_insert(miss);
                }
            }
        }

        match best {
            Some((index, located)) => {
                *self.chosen.lock() = Some(index);
                debug!(
                    component = %spec.impl_type(),
                    constructor = index,
                    "constructor selected"
                );
                Ok((index, located))
            }
            None => Err(first_miss.unwrap_or_else(|| {
                ContainerError::composition(
                    requester_key(ctx),
                    format!("no satisfiable constructor for '{}'", spec.impl_type()),
                )
            })),
        }
    }
}

impl Default for ConstructorInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl Injector for ConstructorInjector {
    fn descriptor(&self) -> &'static str {
        "constructor"
    }

    fn construct(
        &self,
        spec: &ComponentSpec,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ContainerError> {
        let (index, located) = self.select(spec, params, ctx)?;
        let ctor = &spec.constructors()[index];
        let values = located
            .into_iter()
            .zip(ctor.slots())
            .map(|(resolved, slot)| fetch(resolved, slot))
            .collect::<Result<Vec<_>, _>>()?;
        let args = Args::new(ctor.slots(), &values);
        ctor.build(&args)
    }

    fn apply(
        &self,
        _spec: &ComponentSpec,
        _target: &mut (dyn Any + Send + Sync),
        _ctx: &ResolutionContext<'_>,
    ) -> Result<(), ContainerError> {
        Ok(())
    }

    fn dependencies(&self, spec: &ComponentSpec, params: &[Parameter]) -> Vec<DependencyRequest> {
        let ctors = spec.constructors();
        let candidate = if params.is_empty() {
            ctors.iter().max_by_key(|ctor| ctor.slots().len())
        } else {
            ctors
                .iter()
                .find(|ctor| ctor.slots().len() == params.len())
        };
        let Some(ctor) = candidate else {
            return Vec::new();
        };
        ctor.slots()
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| {
                let parameter = params
                    .get(position)
                    .cloned()
                    .unwrap_or_else(|| Parameter::default_for(slot));
                match parameter {
                    Parameter::Constant(_) | Parameter::DefaultConstructor => None,
                    parameter => Some(DependencyRequest {
                        slot: *slot,
                        parameter,
                    }),
                }
            })
            .collect()
    }
}

fn requester_key(ctx: &ResolutionContext<'_>) -> ComponentKey {
    ctx.requester
        .clone()
        .unwrap_or_else(|| ComponentKey::named(ctx.component_label.clone()))
}
