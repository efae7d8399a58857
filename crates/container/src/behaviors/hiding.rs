//! Implementation hiding: the produced instance is reachable only through
//! bound interface views; the concrete type is refused at the boundary.

use std::sync::Arc;

use crate::errors::ContainerError;
use crate::injector::ResolutionContext;
use crate::instance::Instance;
use crate::key::TypeKey;
use crate::spec::ComponentSpec;

use super::{BehaviorKind, Producer, ProducerKind};

pub(crate) struct HidingBehavior {
    inner: Box<dyn Producer>,
    spec: Arc<ComponentSpec>,
}

impl HidingBehavior {
    pub(crate) fn new(inner: Box<dyn Producer>, spec: Arc<ComponentSpec>) -> Self {
        Self { inner, spec }
    }
}

impl Producer for HidingBehavior {
    fn produce(&self, ctx: &ResolutionContext<'_>) -> Result<Instance, ContainerError> {
        self.inner.produce(ctx)
    }

    fn kind(&self) -> ProducerKind {
        ProducerKind::Behavior(BehaviorKind::Hiding)
    }

    fn inner(&self) -> Option<&dyn Producer> {
        Some(self.inner.as_ref())
    }

    fn allows_view(&self, view: &TypeKey) -> bool {
        if *view == self.spec.impl_type() {
            return false;
        }
        self.inner.allows_view(view)
    }
}
