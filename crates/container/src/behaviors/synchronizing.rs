//! Synchronizing behavior: mutual exclusion around every exposed call, not
//! just instantiation. Trades throughput for strict ordering.

use parking_lot::Mutex;

use crate::errors::ContainerError;
use crate::injector::ResolutionContext;
use crate::instance::Instance;
use crate::lifecycle::LifecyclePolicy;

use super::{BehaviorKind, Producer, ProducerKind};

pub(crate) struct SynchronizingBehavior {
    inner: Box<dyn Producer>,
    lock: Mutex<()>,
}

impl SynchronizingBehavior {
    pub(crate) fn new(inner: Box<dyn Producer>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl Producer for SynchronizingBehavior {
    fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        let _guard = self.lock.lock();
        self.inner.produce(ctx)
    }

    fn kind(&self) -> ProducerKind {
        ProducerKind::Behavior(BehaviorKind::Synchronizing)
    }

    fn inner(&self) -> Option<&dyn Producer> {
        Some(self.inner.as_ref())
    }

    fn start(
        &self,
        ctx: &ResolutionContext<'_>,
        policy: &dyn LifecyclePolicy,
    ) -> Result<(), ContainerError> {
        let _guard = self.lock.lock();
        self.inner.start(ctx, policy)
    }

    fn stop(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        let _guard = self.lock.lock();
        self.inner.stop(policy)
    }

    fn dispose(&self, policy: &dyn LifecyclePolicy) -> Result<(), ContainerError> {
        let _guard = self.lock.lock();
        self.inner.dispose(policy)
    }

    fn is_started(&self) -> bool {
        let _guard = self.lock.lock();
        self.inner.is_started()
    }

    fn flush(&self) {
        let _guard = self.lock.lock();
        self.inner.flush();
    }
}
