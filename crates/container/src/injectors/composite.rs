//! Fixed-order composition of injection strategies.
//!
//! The first strategy builds the value; then every strategy's member phase
//! runs in declared order. Strategies contribute disjoint member sets, so
//! the order among them decides sequencing, never overwrites.

use std::any::Any;

use crate::errors::ContainerError;
use crate::injector::{DependencyRequest, Injector, ResolutionContext};
use crate::parameters::Parameter;
use crate::spec::ComponentSpec;

pub struct CompositeInjector {
    parts: Vec<Box<dyn Injector>>,
}

impl CompositeInjector {
    pub fn new(parts: impl IntoIterator<Item = Box<dyn Injector>>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
        }
    }
}

impl Injector for CompositeInjector {
    fn descriptor(&self) -> &'static str {
        "composite"
    }

    fn construct(
        &self,
        spec: &ComponentSpec,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ContainerError> {
        let first = self.parts.first().ok_or_else(|| {
            ContainerError::invalid_chain("composite injection with no strategies")
        })?;
        first.construct(spec, params, ctx)
    }

    fn apply(
        &self,
        spec: &ComponentSpec,
        target: &mut (dyn Any + Send + Sync),
        ctx: &ResolutionContext<'_>,
    ) -> Result<(), ContainerError> {
        for part in &self.parts {
            part.apply(spec, target, ctx)?;
        }
        Ok(())
    }

    fn dependencies(&self, spec: &ComponentSpec, params: &[Parameter]) -> Vec<DependencyRequest> {
        // constructor slots may repeat across parts; duplicate edges are
        // harmless to the validator
        self.parts
            .iter()
            .flat_map(|part| part.dependencies(spec, params))
            .collect()
    }
}
