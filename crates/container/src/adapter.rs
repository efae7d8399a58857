//! The resolved binding for one registered key.
//!
//! An adapter owns its producer chain exclusively. It is created when the
//! registration is composed, never mutated afterwards, and dropped when the
//! component is unregistered or the container goes away.

use std::fmt;
use std::sync::Arc;

use crate::behaviors::{compose, BehaviorKind, Producer, ProducerKind};
use crate::errors::ContainerError;
use crate::injector::{build_injector, DependencyRequest, InjectorKind, ResolutionContext};
use crate::instance::Instance;
use crate::key::{ComponentKey, TypeKey};
use crate::lifecycle::LifecyclePolicy;
use crate::metrics::ContainerMetrics;
use crate::parameters::Parameter;
use crate::spec::ComponentSpec;

pub struct Adapter {
    key: ComponentKey,
    spec: Arc<ComponentSpec>,
    chain: Box<dyn Producer>,
    behavior_kinds: Vec<BehaviorKind>,
}

impl Adapter {
    pub(crate) fn build(
        key: ComponentKey,
        spec: ComponentSpec,
        params: Vec<Parameter>,
        injector_kind: &InjectorKind,
        behavior_kinds: &[BehaviorKind],
        metrics: Arc<ContainerMetrics>,
    ) -> Result<Self, ContainerError> {
        spec.check(&key)?;
        injector_kind.check(&key)?;
        check_params(&key, &params)?;

        let spec = Arc::new(spec);
        let injector = build_injector(injector_kind);
        let chain = compose(
            behavior_kinds,
            key.clone(),
            Arc::clone(&spec),
            params,
            injector,
            metrics,
        )?;

        Ok(Self {
            key,
            spec,
            chain,
            behavior_kinds: behavior_kinds.to_vec(),
        })
    }

    pub fn key(&self) -> &ComponentKey {
        &self.key
    }

    pub fn impl_type(&self) -> TypeKey {
        self.spec.impl_type()
    }

    pub fn spec(&self) -> &ComponentSpec {
        &self.spec
    }

    /// Views this registration can satisfy. Hiding still filters the
    /// concrete view at resolution time.
    pub fn provides(&self, view: &TypeKey) -> bool {
        self.spec.provides(view)
    }

    pub fn behavior_kinds(&self) -> &[BehaviorKind] {
        &self.behavior_kinds
    }

    /// Locate a decorator of the given kind within this adapter's own chain.
    pub fn has_behavior(&self, kind: BehaviorKind) -> bool {
        let mut link: Option<&dyn Producer> = Some(self.chain.as_ref());
        while let Some(producer) = link {
            if producer.kind() == ProducerKind::Behavior(kind) {
                return true;
            }
            link = producer.inner();
        }
        false
    }

    pub fn declares_lifecycle(&self) -> bool {
        self.spec.declares_lifecycle()
    }

    /// Dependency requirements reported by the injection strategy, used for
    /// graph validation and lifecycle ordering.
    pub fn dependencies(&self) -> Vec<DependencyRequest> {
        self.chain.dependency_requests()
    }

    pub(crate) fn allows_view(&self, view: &TypeKey) -> bool {
        self.chain.allows_view(view)
    }

    pub(crate) fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        self.chain.produce(ctx)
    }

    pub(crate) fn cast_view(
        &self,
        view: &TypeKey,
        base: &Instance,
    ) -> Result<Instance, ContainerError> {
        self.spec
            .cast(view, base)
            .ok_or_else(|| ContainerError::type_mismatch(self.key.to_string(), view.name()))
    }

    pub(crate) fn start(
        &self,
        ctx: &ResolutionContext<'_>,
        policy: &dyn LifecyclePolicy,
    ) -> Result<(), ContainerError> {
        self.chain.start(ctx, policy)
    }

    pub(crate) fn stop(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        self.chain.stop(policy)
    }

    pub(crate) fn dispose(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        self.chain.dispose(policy)
    }

    pub(crate) fn has_instance_lifecycle(&self) -> bool {
        self.chain.has_instance_lifecycle()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.chain.is_started()
    }

    pub(crate) fn flush(&self) {
        self.chain.flush();
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("key", &self.key)
            .field("impl_type", &self.impl_type())
            .field("behaviors", &self.behavior_kinds)
            .finish()
    }
}

fn check_params(key: &ComponentKey, params: &[Parameter]) -> Result<(), ContainerError> {
    let markers = params
        .iter()
        .filter(|p| matches!(p, Parameter::DefaultConstructor))
        .count();
    if markers > 0 && params.len() > 1 {
        return Err(ContainerError::composition(
            key.clone(),
            "the zero-argument marker may not be combined with other parameters",
        ));
    }
    Ok(())
}
