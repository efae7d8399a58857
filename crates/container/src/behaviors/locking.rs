//! Locking behavior: mutual exclusion around instantiation.
//!
//! With this behavior outside a cache, concurrent first resolutions of the
//! same adapter serialize: exactly one caller instantiates, the rest block
//! and then observe the cached instance. Re-entry on the same thread is
//! impossible because the cycle guard fires before the lock is taken again.

use parking_lot::Mutex;

use crate::errors::ContainerError;
use crate::injector::ResolutionContext;
use crate::instance::Instance;

use super::{BehaviorKind, Producer, ProducerKind};

pub(crate) struct LockingBehavior {
    inner: Box<dyn Producer>,
    lock: Mutex<()>,
}

impl LockingBehavior {
    pub(crate) fn new(inner: Box<dyn Producer>) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl Producer for LockingBehavior {
    fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        let _guard = self.lock.lock();
        self.inner.produce(ctx)
    }

    fn kind(&self) -> ProducerKind {
        ProducerKind::Behavior(BehaviorKind::Locking)
    }

    fn inner(&self) -> Option<&dyn Producer> {
        Some(self.inner.as_ref())
    }
}
