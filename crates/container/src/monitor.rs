//! Observation hooks around instantiation and lifecycle.
//!
//! A monitor never changes control flow, with one sanctioned exception:
//! [`Monitor::no_component_found`] may supply a fallback instance for a
//! missing key. Everything else is side-effect-only.

use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::ContainerError;
use crate::instance::Instance;
use crate::key::ComponentKey;
use crate::lifecycle::LifecyclePhase;

pub trait Monitor: Send + Sync {
    /// About to run the given injection strategy for `key`.
    fn instantiating(&self, key: &ComponentKey, descriptor: &str) {
        let _ = (key, descriptor);
    }

    /// Instantiation finished successfully.
    fn instantiated(&self, key: &ComponentKey, duration: Duration) {
        let _ = (key, duration);
    }

    /// Instantiation raised an error that is about to propagate.
    fn instantiation_failed(&self, key: &ComponentKey, error: &ContainerError) {
        let _ = (key, error);
    }

    /// A start/stop/dispose call on a component instance returned.
    fn lifecycle_invoked(&self, key: &ComponentKey, phase: LifecyclePhase, duration: Duration) {
        let _ = (key, phase, duration);
    }

    /// A start/stop/dispose call on a component instance failed.
    fn lifecycle_failed(&self, key: &ComponentKey, phase: LifecyclePhase, error: &ContainerError) {
        let _ = (key, phase, error);
    }

    /// Last-chance hook for an explicit key that resolved to nothing. A
    /// `Some` return is used as the resolution result; `None` lets the
    /// original failure propagate. This is a default-value policy hook, not
    /// an error-suppression mechanism.
    fn no_component_found(&self, key: &ComponentKey) -> Option<Instance> {
        let _ = key;
        None
    }
}

/// Monitor that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl Monitor for NullMonitor {}

/// Monitor that forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn instantiating(&self, key: &ComponentKey, descriptor: &str) {
        debug!(component = %key, strategy = descriptor, "instantiating");
    }

    fn instantiated(&self, key: &ComponentKey, duration: Duration) {
        debug!(component = %key, elapsed_us = duration.as_micros() as u64, "instantiated");
    }

    fn instantiation_failed(&self, key: &ComponentKey, error: &ContainerError) {
        warn!(component = %key, category = error.category(), %error, "instantiation failed");
    }

    fn lifecycle_invoked(&self, key: &ComponentKey, phase: LifecyclePhase, duration: Duration) {
        debug!(component = %key, %phase, elapsed_us = duration.as_micros() as u64, "lifecycle invoked");
    }

    fn lifecycle_failed(&self, key: &ComponentKey, phase: LifecyclePhase, error: &ContainerError) {
        warn!(component = %key, %phase, %error, "lifecycle invocation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{pack, unpack};
    use std::sync::Arc;

    struct FallbackMonitor;

    impl Monitor for FallbackMonitor {
        fn no_component_found(&self, key: &ComponentKey) -> Option<Instance> {
            if *key == ComponentKey::named("retries") {
                Some(pack(Arc::new(3_u32)))
            } else {
                None
            }
        }
    }

    #[test]
    fn test_default_hooks_are_inert() {
        let monitor = NullMonitor;
        monitor.instantiating(&ComponentKey::named("a"), "constructor");
        monitor.instantiated(&ComponentKey::named("a"), Duration::from_micros(5));
        assert!(monitor.no_component_found(&ComponentKey::named("a")).is_none());
    }

    #[test]
    fn test_fallback_only_for_matching_key() {
        let monitor = FallbackMonitor;
        let hit = monitor
            .no_component_found(&ComponentKey::named("retries"))
            .expect("fallback supplied");
        assert_eq!(*unpack::<u32>(&hit).expect("u32 handle"), 3);
        assert!(monitor.no_component_found(&ComponentKey::named("other")).is_none());
    }
}
