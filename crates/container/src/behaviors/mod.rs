//! Behavior decoration around an injection strategy.
//!
//! A producer chain is described outermost-first by a list of
//! [`BehaviorKind`]s and composed around the innermost injecting producer.
//! Composition is validated up front: a chain that could not honor its
//! guarantees (duplicate behaviors, a lock inside the cache it is supposed
//! to serialize, hiding that is not outermost) is rejected when the adapter
//! is built, not at first use.

mod caching;
mod hiding;
mod locking;
mod synchronizing;

pub(crate) use caching::CachingBehavior;
pub(crate) use hiding::HidingBehavior;
pub(crate) use locking::LockingBehavior;
pub(crate) use synchronizing::SynchronizingBehavior;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::errors::ContainerError;
use crate::injector::{DependencyRequest, Injector, ResolutionContext};
use crate::instance::Instance;
use crate::key::{ComponentKey, TypeKey};
use crate::lifecycle::LifecyclePolicy;
use crate::metrics::ContainerMetrics;
use crate::parameters::Parameter;
use crate::spec::ComponentSpec;

/// Cross-cutting capability composed around an injection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorKind {
    /// At most one instance per container activation.
    Caching,
    /// Mutual exclusion around instantiation.
    Locking,
    /// Mutual exclusion around every exposed operation.
    Synchronizing,
    /// Expose only bound interface views, never the concrete type.
    Hiding,
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BehaviorKind::Caching => "caching",
            BehaviorKind::Locking => "locking",
            BehaviorKind::Synchronizing => "synchronizing",
            BehaviorKind::Hiding => "implementation hiding",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProducerKind {
    Injecting,
    Behavior(BehaviorKind),
}

/// A link in an adapter's chain. Behaviors delegate everything they do not
/// themselves intercept.
pub(crate) trait Producer: Send + Sync {
    fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError>;

    fn kind(&self) -> ProducerKind;

    fn inner(&self) -> Option<&dyn Producer>;

    fn allows_view(&self, view: &TypeKey) -> bool {
        match self.inner() {
            Some(inner) => inner.allows_view(view),
            None => true,
        }
    }

    fn start(
        &self,
        ctx: &ResolutionContext<'_>,
        policy: &dyn LifecyclePolicy,
    ) -> Result<(), ContainerError> {
        match self.inner() {
            Some(inner) => inner.start(ctx, policy),
            None => Ok(()),
        }
    }

    fn stop(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        match self.inner() {
            Some(inner) => inner.stop(policy),
            None => Ok(()),
        }
    }

    fn dispose(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        match self.inner() {
            Some(inner) => inner.dispose(policy),
            None => Ok(()),
        }
    }

    /// Whether this chain can hold a stable instance with lifecycle.
    fn has_instance_lifecycle(&self) -> bool {
        match self.inner() {
            Some(inner) => inner.has_instance_lifecycle(),
            None => false,
        }
    }

    fn is_started(&self) -> bool {
        match self.inner() {
            Some(inner) => inner.is_started(),
            None => false,
        }
    }

    /// Drop any cached instance without lifecycle calls.
    fn flush(&self) {
        if let Some(inner) = self.inner() {
            inner.flush();
        }
    }

    fn dependency_requests(&self) -> Vec<DependencyRequest> {
        match self.inner() {
            Some(inner) => inner.dependency_requests(),
            None => Vec::new(),
        }
    }
}

/// Innermost link: runs the injection strategy and seals the result.
pub(crate) struct InjectingProducer {
    key: ComponentKey,
    spec: Arc<ComponentSpec>,
    params: Vec<Parameter>,
    injector: Box<dyn Injector>,
}

impl Producer for InjectingProducer {
    fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        if let Some(preset) = self.spec.preset() {
            return Ok(preset.clone());
        }

        let started_at = Instant::now();
        ctx.monitor
            .instantiating(&self.key, self.injector.descriptor());

        let built = self
            .injector
            .construct(&self.spec, &self.params, ctx)
            .and_then(|mut value| {
                self.injector.apply(&self.spec, value.as_mut(), ctx)?;
                self.spec.seal(value)
            });

        match built {
            Ok(instance) => {
                ctx.monitor.instantiated(&self.key, started_at.elapsed());
                Ok(instance)
            }
            Err(error) => {
                ctx.monitor.instantiation_failed(&self.key, &error);
                Err(error)
            }
        }
    }

    fn kind(&self) -> ProducerKind {
        ProducerKind::Injecting
    }

    fn inner(&self) -> Option<&dyn Producer> {
        None
    }

    fn dependency_requests(&self) -> Vec<DependencyRequest> {
        self.injector.dependencies(&self.spec, &self.params)
    }
}

/// Reject chains that could not keep their composition guarantees.
pub(crate) fn validate_chain(kinds: &[BehaviorKind]) -> Result<(), ContainerError> {
    for (position, kind) in kinds.iter().enumerate() {
        if kinds[..position].contains(kind) {
            return Err(ContainerError::invalid_chain(format!(
                "behavior '{kind}' is listed more than once"
            )));
        }
    }

    if let Some(position) = kinds.iter().position(|k| *k == BehaviorKind::Hiding) {
        if position != 0 {
            return Err(ContainerError::invalid_chain(
                "implementation hiding must be the outermost behavior",
            ));
        }
    }

    if let Some(cache_at) = kinds.iter().position(|k| *k == BehaviorKind::Caching) {
        for lock_kind in [BehaviorKind::Locking, BehaviorKind::Synchronizing] {
            if let Some(lock_at) = kinds.iter().position(|k| *k == lock_kind) {
                if lock_at > cache_at {
                    return Err(ContainerError::invalid_chain(format!(
                        "'{lock_kind}' must wrap '{}' so concurrent first resolutions serialize",
                        BehaviorKind::Caching
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Build the chain, outermost-first, around the injecting producer.
pub(crate) fn compose(
    kinds: &[BehaviorKind],
    key: ComponentKey,
    spec: Arc<ComponentSpec>,
    params: Vec<Parameter>,
    injector: Box<dyn Injector>,
    metrics: Arc<ContainerMetrics>,
) -> Result<Box<dyn Producer>, ContainerError> {
    validate_chain(kinds)?;

    let mut producer: Box<dyn Producer> = Box::new(InjectingProducer {
        key: key.clone(),
        spec: Arc::clone(&spec),
        params,
        injector,
    });

    for kind in kinds.iter().rev() {
        producer = match kind {
            BehaviorKind::Caching => Box::new(CachingBehavior::new(
                producer,
                Arc::clone(&spec),
                Arc::clone(&metrics),
            )),
            BehaviorKind::Locking => Box::new(LockingBehavior::new(producer)),
            BehaviorKind::Synchronizing => Box::new(SynchronizingBehavior::new(producer)),
            BehaviorKind::Hiding => Box::new(HidingBehavior::new(producer, Arc::clone(&spec))),
        };
    }

    Ok(producer)
}
