//! Caching behavior: one instance per container activation.
//!
//! The cache entry also tracks the instance's lifecycle state, because only
//! a stable instance can be stopped or disposed later. Dispose clears the
//! entry and is latched so per-component disposal logic never runs twice.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::errors::ContainerError;
use crate::injector::ResolutionContext;
use crate::instance::Instance;
use crate::lifecycle::LifecyclePolicy;
use crate::metrics::ContainerMetrics;
use crate::spec::ComponentSpec;

use super::{BehaviorKind, Producer, ProducerKind};

#[derive(Default)]
struct CacheState {
    instance: Option<Instance>,
    started: bool,
    disposed: bool,
}

pub(crate) struct CachingBehavior {
    inner: Box<dyn Producer>,
    spec: Arc<ComponentSpec>,
    metrics: Arc<ContainerMetrics>,
    state: Mutex<CacheState>,
}

impl CachingBehavior {
    pub(crate) fn new(
        inner: Box<dyn Producer>,
        spec: Arc<ComponentSpec>,
        metrics: Arc<ContainerMetrics>,
    ) -> Self {
        Self {
            inner,
            spec,
            metrics,
            state: Mutex::new(CacheState::default()),
        }
    }
}

impl Producer for CachingBehavior {
    fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        {
            let state = self.state.lock();
            if let Some(instance) = &state.instance {
                self.metrics.record_cache_hit();
                return Ok(instance.clone());
            }
        }

        // The lock is not held across instantiation; without a Locking
        // behavior outside this one, concurrent first resolutions may race
        // and the first writer wins.
        self.metrics.record_cache_miss();
        let fresh = self.inner.produce(ctx)?;

        let mut state = self.state.lock();
        match &state.instance {
            Some(existing) => Ok(existing.clone()),
            None => {
                state.instance = Some(fresh.clone());
                state.disposed = false;
                Ok(fresh)
            }
        }
    }

    fn kind(&self) -> ProducerKind {
        ProducerKind::Behavior(BehaviorKind::Caching)
    }

    fn inner(&self) -> Option<&dyn Producer> {
        Some(self.inner.as_ref())
    }

    fn start(
        &self,
        ctx: &ResolutionContext<'_>,
        policy: &dyn LifecyclePolicy,
    ) -> Result<(), ContainerError> {
        let instance = self.produce(ctx)?;
        {
            let state = self.state.lock();
            if state.started {
                return Ok(());
            }
        }
        if let Some(lifecycle) = policy.lifecycle_of(&self.spec, &instance) {
            lifecycle.start()?;
            self.state.lock().started = true;
            debug!(component = %self.spec.impl_type(), "component started");
        }
        Ok(())
    }

    fn stop(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        let instance = {
            let mut state = self.state.lock();
            if !state.started {
                return Ok(());
            }
            state.started = false;
            state.instance.clone()
        };
        if let Some(instance) = instance {
            if let Some(lifecycle) = policy.lifecycle_of(&self.spec, &instance) {
                lifecycle.stop()?;
                debug!(component = %self.spec.impl_type(), "component stopped");
            }
        }
        Ok(())
    }

    fn dispose(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        let instance = {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
            state.started = false;
            state.instance.take()
        };
        if let Some(instance) = instance {
            if let Some(lifecycle) = policy.lifecycle_of(&self.spec, &instance) {
                lifecycle.dispose()?;
                debug!(component = %self.spec.impl_type(), "component disposed");
            }
        }
        Ok(())
    }

    fn has_instance_lifecycle(&self) -> bool {
        self.spec.declares_lifecycle()
    }

    fn is_started(&self) -> bool {
        self.state.lock().started
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        state.instance = None;
        state.started = false;
    }
}
