//! Injection strategy contract and resolution bookkeeping.
//!
//! An [`Injector`] turns a [`ComponentSpec`](crate::spec::ComponentSpec)
//! into a live instance in two phases: `construct` (pick a constructor,
//! resolve its arguments, build) and `apply` (populate injectable members
//! of the freshly built value). The composite strategy chains both phases
//! across several variants.
//!
//! A thread-local stack of in-flight keys turns re-entrant resolution of
//! the same adapter into a cyclic-dependency error instead of unbounded
//! recursion, and doubles as the depth limiter.

use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use crate::container::Container;
use crate::errors::ContainerError;
use crate::key::{ComponentKey, Slot};
use crate::monitor::Monitor;
use crate::parameters::Parameter;
use crate::spec::ComponentSpec;

/// Ambient state for one resolution step.
pub struct ResolutionContext<'a> {
    pub(crate) container: &'a Arc<Container>,
    /// Key of the adapter currently being resolved; excluded from type
    /// scans so a component can never be satisfied by itself.
    pub(crate) requester: Option<ComponentKey>,
    /// Implementation name used in error messages.
    pub(crate) component_label: String,
    pub(crate) monitor: Arc<dyn Monitor>,
}

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<ComponentKey>> = RefCell::new(Vec::new());
}

/// Pops the resolution stack when the resolution step unwinds.
#[derive(Debug)]
pub(crate) struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Enter a resolution step for `key`. Fails when the key is already being
/// resolved on this thread (a cycle) or the stack outgrew `max_depth`.
pub(crate) fn enter_resolution(
    key: &ComponentKey,
    max_depth: usize,
) -> Result<StackGuard, ContainerError> {
    RESOLUTION_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.iter().any(|entry| entry == key) {
            let mut path: Vec<String> = stack.iter().map(ToString::to_string).collect();
            path.push(key.to_string());
            return Err(ContainerError::CyclicDependency {
                path: path.join(" -> "),
            });
        }
        if stack.len() >= max_depth {
            return Err(ContainerError::DepthExceeded {
                limit: max_depth,
                component: key.to_string(),
            });
        }
        stack.push(key.clone());
        Ok(StackGuard)
    })
}

/// One dependency requirement an injector reports for graph validation.
#[derive(Clone, Debug)]
pub struct DependencyRequest {
    pub slot: Slot,
    pub parameter: Parameter,
}

/// A strategy for producing and populating component instances.
pub trait Injector: Send + Sync {
    /// Human-readable strategy name for monitors and errors.
    fn descriptor(&self) -> &'static str;

    /// Select a constructor, resolve its arguments and build the value.
    fn construct(
        &self,
        spec: &ComponentSpec,
        params: &[Parameter],
        ctx: &ResolutionContext<'_>,
    ) -> Result<Box<dyn Any + Send + Sync>, ContainerError>;

    /// Populate the members this strategy is responsible for. Strategies
    /// must touch disjoint member sets so composition stays well-defined.
    fn apply(
        &self,
        spec: &ComponentSpec,
        target: &mut (dyn Any + Send + Sync),
        ctx: &ResolutionContext<'_>,
    ) -> Result<(), ContainerError>;

    /// Dependency requirements, for validation and lifecycle ordering.
    fn dependencies(&self, spec: &ComponentSpec, params: &[Parameter]) -> Vec<DependencyRequest>;
}

/// Declarative choice of injection strategy at registration time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InjectorKind {
    /// Constructor injection only (the default).
    Constructor,
    /// Constructor, then untagged setter members.
    Setter,
    /// Constructor, then untagged field members.
    Field,
    /// Constructor, then members carrying this tag.
    Tagged(String),
    /// Fixed-order chain of the above, each contributing disjoint members.
    Composite(Vec<InjectorKind>),
}

impl InjectorKind {
    /// Validate the declared shape; nested composites are rejected.
    pub(crate) fn check(&self, key: &ComponentKey) -> Result<(), ContainerError> {
        if let InjectorKind::Composite(parts) = self {
            if parts.is_empty() {
                return Err(ContainerError::composition(
                    key.clone(),
                    "composite injection needs at least one strategy",
                ));
            }
            for part in parts {
                if matches!(part, InjectorKind::Composite(_)) {
                    return Err(ContainerError::composition(
                        key.clone(),
                        "composite injection cannot nest another composite",
                    ));
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn build_injector(kind: &InjectorKind) -> Box<dyn Injector> {
    use crate::injectors::{CompositeInjector, ConstructorInjector, MemberInjector};

    match kind {
        InjectorKind::Constructor => Box::new(ConstructorInjector::new()),
        InjectorKind::Setter => Box::new(MemberInjector::setters()),
        InjectorKind::Field => Box::new(MemberInjector::fields()),
        InjectorKind::Tagged(tag) => Box::new(MemberInjector::tagged(tag.clone())),
        InjectorKind::Composite(parts) => {
            Box::new(CompositeInjector::new(parts.iter().map(build_injector)))
        }
    }
}
