//! Iterative member injection: setters, fields, and tagged members.
//!
//! The value is first built through constructor selection, then each member
//! in the strategy's set is resolved independently and applied in
//! declaration order.

use std::any::Any;

use tracing::debug;

use crate::errors::ContainerError;
use crate::injector::{DependencyRequest, Injector, ResolutionContext};
use crate::parameters::{fetch, locate, Parameter};
use crate::spec::{ComponentSpec, MemberKind, MemberSpec};

use super::ConstructorInjector;

enum MemberMode {
    Setters,
    Fields,
    Tagged(String),
}

pub struct MemberInjector {
    mode: MemberMode,
    constructor: ConstructorInjector,
}

impl MemberInjector {
    pub fn setters() -> Self {
        Self::with_mode(MemberMode::Setters)
    }

    pub fn fields() -> Self {
        Self::with_mode(MemberMode::Fields)
    }

    pub fn tagged(tag: String) -> Self {
        Self::with_mode(MemberMode::Tagged(tag))
    }

    fn with_mode(mode: MemberMode) -> Self {
        Self {
            mode,
            constructor: ConstructorInjector::new(),
        }
    }

    fn selects(&self, member: &MemberSpec) -> bool {
        match &self.mode {
            MemberMode::Setters => member.kind() == MemberKind::Setter && member.tag().is_none(),
            MemberMode::Fields => member.kind() == MemberKind::Field && member.tag().is_none(),
            MemberMode::Tagged(tag) => member.tag() == Some(tag.as_str()),
        }
    }
}

impl Injector for MemberInjector {
    fn descriptor(&self) -> &'static str {
        match self.mode {
            MemberMode::Setters => "setter",
            MemberMode::Fields => "field",
            MemberMode::Tagged(_) => "tagged",
        }
    }

    fn construct(
        &self,
        spec: &ComponentSpec,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ContainerError> {
        self.constructor.construct(spec, params, ctx)
    }

    fn apply(
        &self,
        spec: &ComponentSpec,
        target: &mut (dyn Any + Send + Sync),
        ctx: &ResolutionContext<'_>,
    ) -> Result<(), ContainerError> {
        for member in spec.members().iter().filter(|member| self.selects(member)) {
            let parameter = Parameter::default_for(member.slot());
            let resolved = locate(&parameter, member.slot(), ctx)?;
            let value = fetch(resolved, member.slot())?;
            member.apply(target, value)?;
            debug!(
                component = %spec.impl_type(),
                member = member.name(),
                strategy = self.descriptor(),
                "member injected"
            );
        }
        Ok(())
    }

    fn dependencies(&self, spec: &ComponentSpec, params: &[Parameter]) -> Vec<DependencyRequest> {
        let mut requests = self.constructor.dependencies(spec, params);
        requests.extend(
            spec.members()
                .iter()
                .filter(|member| self.selects(member))
                .map(|member| DependencyRequest {
                    slot: *member.slot(),
                    parameter: Parameter::default_for(member.slot()),
                }),
        );
        requests
    }
}
