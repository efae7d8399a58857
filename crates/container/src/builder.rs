//! Fluent assembly of containers.
//!
//! The builder collects behavior choices as flags and lays them out in the
//! one canonical order that passes chain validation (hiding outermost, then
//! synchronizing, locking, caching). An explicit chain can still be supplied
//! and is validated on build.

use std::sync::Arc;

use crate::behaviors::BehaviorKind;
use crate::config::ContainerConfig;
use crate::container::Container;
use crate::errors::ContainerError;
use crate::key::ComponentKey;
use crate::lifecycle::{LifecyclePolicy, NullLifecycle, StartableLifecycle};
use crate::monitor::{Monitor, NullMonitor, TracingMonitor};

pub struct ContainerBuilder {
    config: ContainerConfig,
    caching: bool,
    locking: bool,
    synchronizing: bool,
    hiding: bool,
    explicit_chain: Option<Vec<BehaviorKind>>,
    policy: Arc<dyn LifecyclePolicy>,
    monitor: Arc<dyn Monitor>,
    parent: Option<Arc<Container>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
            caching: true,
            locking: false,
            synchronizing: false,
            hiding: false,
            explicit_chain: None,
            policy: Arc::new(StartableLifecycle),
            monitor: Arc::new(NullMonitor),
            parent: None,
        }
    }

    pub fn with_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    pub fn with_locking(mut self) -> Self {
        self.locking = true;
        self
    }

    pub fn with_synchronizing(mut self) -> Self {
        self.synchronizing = true;
        self
    }

    pub fn with_hiding(mut self) -> Self {
        self.hiding = true;
        self
    }

    /// Replace the flag-driven chain with an explicit one, outermost first.
    pub fn with_behaviors(mut self, chain: Vec<BehaviorKind>) -> Self {
        self.explicit_chain = Some(chain);
        self
    }

    pub fn with_lifecycle_policy(mut self, policy: Arc<dyn LifecyclePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// No component receives start/stop/dispose calls.
    pub fn with_null_lifecycle(self) -> Self {
        self.with_lifecycle_policy(Arc::new(NullLifecycle))
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_tracing_monitor(self) -> Self {
        self.with_monitor(Arc::new(TracingMonitor))
    }

    pub fn as_child_of(mut self, parent: &Arc<Container>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    fn chain(&self) -> Vec<BehaviorKind> {
        if let Some(chain) = &self.explicit_chain {
            return chain.clone();
        }
        let mut chain = Vec::new();
        if self.hiding {
            chain.push(BehaviorKind::Hiding);
        }
        if self.synchronizing {
            chain.push(BehaviorKind::Synchronizing);
        }
        if self.locking {
            chain.push(BehaviorKind::Locking);
        }
        if self.caching {
            chain.push(BehaviorKind::Caching);
        }
        chain
    }

    pub fn build(self) -> Result<Arc<Container>, ContainerError> {
        let chain = self.chain();
        let mut config = self.config;
        config.default_behaviors = chain;

        let report = config.validate();
        if !report.is_valid() {
            return Err(ContainerError::composition(
                ComponentKey::named(config.name.clone()),
                report.errors.join("; "),
            ));
        }

        let container = Container::assemble(
            config,
            self.policy,
            self.monitor,
            std::sync::Weak::new(),
        );
        if let Some(parent) = self.parent {
            parent.add_child(Arc::clone(&container))?;
        }
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
