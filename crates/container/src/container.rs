//! The container: an ordered adapter registry with hierarchy and lifecycle.
//!
//! Lookup goes local-first and falls back to the parent chain; a parent
//! never sees a child's registrations. Start visits lifecycle-eligible
//! adapters in registration order (dependencies enter the instantiation
//! ledger before their dependents, because they finish resolving first),
//! children are started after the container's own components, and stop and
//! dispose run everything in exact reverse. Teardown failures are collected
//! and raised together once every component has been visited.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::behaviors::BehaviorKind;
use crate::config::ContainerConfig;
use crate::errors::ContainerError;
use crate::graph::DependencyGraph;
use crate::injector::{enter_resolution, InjectorKind, ResolutionContext};
use crate::instance::{unpack, Instance};
use crate::key::{ComponentKey, TypeKey};
use crate::lifecycle::{ContainerState, LifecyclePhase, LifecyclePolicy, StartableLifecycle};
use crate::metrics::{ContainerMetrics, ContainerStats};
use crate::monitor::{Monitor, NullMonitor};
use crate::parameters::{locate, locate_scalar, Parameter, Resolved};
use crate::spec::ComponentSpec;

pub struct Container {
    config: ContainerConfig,
    self_ref: Weak<Container>,
    parent: RwLock<Weak<Container>>,
    children: RwLock<Vec<Arc<Container>>>,
    /// Children this container transitioned through its own start.
    children_started: RwLock<Vec<Weak<Container>>>,
    /// Registration order, the basis of deterministic lifecycle order.
    adapters: RwLock<Vec<Arc<Adapter>>>,
    by_key: RwLock<HashMap<ComponentKey, Arc<Adapter>>>,
    /// Keys in the order their instances were first produced; dependencies
    /// land before their dependents.
    instantiation_order: RwLock<Vec<ComponentKey>>,
    state: RwLock<ContainerState>,
    monitor: RwLock<Arc<dyn Monitor>>,
    policy: Arc<dyn LifecyclePolicy>,
    metrics: Arc<ContainerMetrics>,
}

impl Container {
    pub fn new() -> Arc<Self> {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Arc<Self> {
        Self::assemble(
            config,
            Arc::new(StartableLifecycle),
            Arc::new(NullMonitor),
            Weak::new(),
        )
    }

    pub(crate) fn assemble(
        config: ContainerConfig,
        policy: Arc<dyn LifecyclePolicy>,
        monitor: Arc<dyn Monitor>,
        parent: Weak<Container>,
    ) -> Arc<Self> {
        let metrics = Arc::new(ContainerMetrics::new(config.collect_metrics));
        Arc::new_cyclic(|weak| Self {
            config,
            self_ref: weak.clone(),
            parent: RwLock::new(parent),
            children: RwLock::new(Vec::new()),
            children_started: RwLock::new(Vec::new()),
            adapters: RwLock::new(Vec::new()),
            by_key: RwLock::new(HashMap::new()),
            instantiation_order: RwLock::new(Vec::new()),
            state: RwLock::new(ContainerState::NotStarted),
            monitor: RwLock::new(monitor),
            policy,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn state(&self) -> ContainerState {
        *self.state.read()
    }

    pub fn stats(&self) -> ContainerStats {
        self.metrics.snapshot()
    }

    // ---- registration -----------------------------------------------------

    /// Register a component under the container's default behavior chain
    /// with constructor injection.
    pub fn register(
        &self,
        key: impl Into<ComponentKey>,
        spec: ComponentSpec,
        params: Vec<Parameter>,
    ) -> Result<(), ContainerError> {
        self.register_with(key, spec, params, InjectorKind::Constructor, None)
    }

    /// Register with an explicit injection strategy and, optionally, an
    /// explicit behavior chain (outermost first).
    pub fn register_with(
        &self,
        key: impl Into<ComponentKey>,
        spec: ComponentSpec,
        params: Vec<Parameter>,
        injector: InjectorKind,
        behaviors: Option<Vec<BehaviorKind>>,
    ) -> Result<(), ContainerError> {
        let key = key.into();
        self.ensure_not_started("register component")?;
        if self.by_key.read().contains_key(&key) {
            return Err(ContainerError::DuplicateKey { key });
        }

        let kinds = behaviors.unwrap_or_else(|| self.config.default_behaviors.clone());
        let adapter = Arc::new(Adapter::build(
            key.clone(),
            spec,
            params,
            &injector,
            &kinds,
            Arc::clone(&self.metrics),
        )?);

        let mut adapters = self.adapters.write();
        let mut by_key = self.by_key.write();
        if by_key.contains_key(&key) {
            return Err(ContainerError::DuplicateKey { key });
        }
        by_key.insert(key.clone(), Arc::clone(&adapter));
        adapters.push(adapter);
        self.metrics.record_registration();
        debug!(container = self.name(), component = %key, "component registered");
        Ok(())
    }

    /// Register a pre-built value under its concrete type key.
    pub fn register_instance<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ComponentKey>,
        value: T,
    ) -> Result<(), ContainerError> {
        self.register(key, ComponentSpec::instance(value).build(), Vec::new())
    }

    /// Remove a registration. Fails once the container has transitioned past
    /// not-started: the lifecycle order is derived from the registry.
    pub fn unregister(
        &self,
        key: &ComponentKey,
    ) -> Result<Option<Arc<Adapter>>, ContainerError> {
        self.ensure_not_started("unregister component")?;
        let mut adapters = self.adapters.write();
        let mut by_key = self.by_key.write();
        match by_key.remove(key) {
            Some(adapter) => {
                adapters.retain(|entry| entry.key() != key);
                self.instantiation_order.write().retain(|entry| entry != key);
                debug!(container = self.name(), component = %key, "component unregistered");
                Ok(Some(adapter))
            }
            None => Ok(None),
        }
    }

    /// Explicit replace: remove the existing registration for `key`, then
    /// register `value` in its place.
    pub fn replace_instance<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ComponentKey>,
        value: T,
    ) -> Result<(), ContainerError> {
        let key = key.into();
        self.unregister(&key)?;
        self.register_instance(key, value)
    }

    /// Registered adapters in registration order.
    pub fn adapters(&self) -> Vec<Arc<Adapter>> {
        self.adapters.read().clone()
    }

    // ---- resolution -------------------------------------------------------

    /// Resolve by type: exactly one local candidate, or the parent chain.
    pub fn resolve<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>, ContainerError> {
        let me = self.strong()?;
        let view = TypeKey::of::<I>();
        match locate_scalar(&me, view, None, "<lookup>")? {
            Resolved::One { owner, adapter } => {
                let instance = owner.instance_as_internal(&adapter, view)?;
                unpack::<I>(&instance).ok_or_else(|| {
                    ContainerError::type_mismatch(adapter.key().to_string(), view.name())
                })
            }
            _ => Err(ContainerError::unsatisfiable(view.name(), "<lookup>")),
        }
    }

    /// Resolve exactly the given key, in this container or an ancestor. The
    /// monitor's fallback hook is the only recovery path for a miss.
    pub fn resolve_key<I: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<ComponentKey>,
    ) -> Result<Arc<I>, ContainerError> {
        let key = key.into();
        let view = TypeKey::of::<I>();
        match self.find_by_key_chain(&key) {
            Some((owner, adapter)) => {
                let instance = owner.instance_as_internal(&adapter, view)?;
                unpack::<I>(&instance)
                    .ok_or_else(|| ContainerError::type_mismatch(key.to_string(), view.name()))
            }
            None => {
                let monitor = self.monitor.read().clone();
                match monitor.no_component_found(&key) {
                    Some(fallback) => unpack::<I>(&fallback).ok_or_else(|| {
                        ContainerError::type_mismatch(
                            format!("monitor fallback for '{key}'"),
                            view.name(),
                        )
                    }),
                    None => Err(ContainerError::NoSuchComponent { key }),
                }
            }
        }
    }

    /// Every local candidate for the view, in registration order. Never
    /// consults the parent; an empty result is a valid answer here.
    pub fn resolve_all<I: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<Arc<I>>, ContainerError> {
        let view = TypeKey::of::<I>();
        self.local_candidates(view, None)
            .iter()
            .map(|adapter| {
                let instance = self.instance_as_internal(adapter, view)?;
                unpack::<I>(&instance).ok_or_else(|| {
                    ContainerError::type_mismatch(adapter.key().to_string(), view.name())
                })
            })
            .collect()
    }

    // ---- hierarchy --------------------------------------------------------

    pub fn parent(&self) -> Option<Arc<Container>> {
        self.parent.read().upgrade()
    }

    pub fn children(&self) -> Vec<Arc<Container>> {
        self.children.read().clone()
    }

    /// Create a child container. The child snapshots this container's
    /// monitor and lifecycle policy; a later monitor swap on the parent does
    /// not propagate.
    pub fn make_child(&self) -> Result<Arc<Container>, ContainerError> {
        let me = self.strong()?;
        let mut child_config = self.config.clone();
        child_config.name = format!("{}.child{}", self.name(), self.children.read().len());
        let child = Container::assemble(
            child_config,
            Arc::clone(&self.policy),
            self.monitor.read().clone(),
            Arc::downgrade(&me),
        );
        self.attach_child(Arc::clone(&child));
        debug!(container = self.name(), child = child.name(), "child container created");
        Ok(child)
    }

    /// Attach an existing container as a child. The child must not already
    /// have a parent.
    pub fn add_child(&self, child: Arc<Container>) -> Result<(), ContainerError> {
        let me = self.strong()?;
        if Arc::ptr_eq(&me, &child) {
            return Err(ContainerError::composition(
                ComponentKey::named(self.name().to_string()),
                "a container cannot be its own child",
            ));
        }
        {
            let mut parent_slot = child.parent.write();
            if parent_slot.upgrade().is_some() {
                return Err(ContainerError::composition(
                    ComponentKey::named(child.name().to_string()),
                    "container already has a parent",
                ));
            }
            *parent_slot = Arc::downgrade(&me);
        }
        self.attach_child(child);
        Ok(())
    }

    pub fn remove_child(&self, child: &Arc<Container>) -> bool {
        let mut children = self.children.write();
        let before = children.len();
        children.retain(|entry| !Arc::ptr_eq(entry, child));
        let removed = children.len() != before;
        if removed {
            *child.parent.write() = Weak::new();
            self.children_started
                .write()
                .retain(|weak| weak.upgrade().is_some_and(|c| !Arc::ptr_eq(&c, child)));
        }
        removed
    }

    fn attach_child(&self, child: Arc<Container>) {
        {
            let mut children = self.children.write();
            children.push(Arc::clone(&child));
        }
        if self.state() == ContainerState::Started {
            self.children_started.write().push(Arc::downgrade(&child));
        }
    }

    // ---- monitor ----------------------------------------------------------

    /// Replace the container-scoped monitor, returning the previous one.
    /// Affects only this container; children keep their snapshot.
    pub fn swap_monitor(&self, monitor: Arc<dyn Monitor>) -> Arc<dyn Monitor> {
        std::mem::replace(&mut *self.monitor.write(), monitor)
    }

    pub fn monitor(&self) -> Arc<dyn Monitor> {
        self.monitor.read().clone()
    }

    // ---- lifecycle --------------------------------------------------------

    /// Start this container's components in registration order, then its
    /// children.
    pub fn start(&self) -> Result<(), ContainerError> {
        let me = self.strong()?;
        {
            let state = self.state.read();
            if !state.can_start() {
                return Err(ContainerError::lifecycle_violation(
                    "start",
                    self.name(),
                    *state,
                ));
            }
        }
        if self.config.validate_on_start {
            self.validate()?;
        }
        *self.state.write() = ContainerState::Started;
        debug!(container = self.name(), "starting");

        // Instantiate eligible components in registration order so the
        // ledger captures dependencies before their dependents.
        let eligible: Vec<Arc<Adapter>> = self
            .adapters
            .read()
            .iter()
            .filter(|adapter| self.lifecycle_eligible(adapter))
            .cloned()
            .collect();
        for adapter in &eligible {
            self.produce_base(adapter)?;
        }

        let order = self.instantiation_order.read().clone();
        for key in order {
            if let Some(adapter) = self.adapter_by_key(&key) {
                if self.lifecycle_eligible(&adapter) && !adapter.is_started() {
                    self.invoke_lifecycle(&me, &adapter, LifecyclePhase::Start)?;
                }
            }
        }

        self.children_started.write().clear();
        let children = self.children.read().clone();
        for child in children {
            self.children_started.write().push(Arc::downgrade(&child));
            child.start()?;
        }
        Ok(())
    }

    /// Stop children first, then this container's components in reverse
    /// instantiation order. Failures are collected, not short-circuited.
    pub fn stop(&self) -> Result<(), ContainerError> {
        let me = self.strong()?;
        {
            let state = self.state.read();
            if !state.can_stop() {
                return Err(ContainerError::lifecycle_violation(
                    "stop",
                    self.name(),
                    *state,
                ));
            }
        }
        debug!(container = self.name(), "stopping");
        let mut failures = Vec::new();

        let started_children: Vec<Arc<Container>> = self
            .children_started
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for child in started_children.iter().rev() {
            if child.state() == ContainerState::Started {
                if let Err(error) = child.stop() {
                    failures.push(error);
                }
            }
        }

        let order = self.instantiation_order.read().clone();
        for key in order.iter().rev() {
            if let Some(adapter) = self.adapter_by_key(key) {
                if adapter.is_started() {
                    if let Err(error) =
                        self.invoke_lifecycle(&me, &adapter, LifecyclePhase::Stop)
                    {
                        failures.push(error);
                    }
                }
            }
        }

        *self.state.write() = ContainerState::Stopped;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::aggregate("stop", failures))
        }
    }

    /// Dispose the whole subtree. Runs the stop cascade first when still
    /// started; disposing twice is a no-op. Every component is visited even
    /// when earlier ones fail.
    pub fn dispose(&self) -> Result<(), ContainerError> {
        let me = self.strong()?;
        if self.state() == ContainerState::Disposed {
            return Ok(());
        }
        let mut failures = Vec::new();
        if self.state() == ContainerState::Started {
            if let Err(error) = self.stop() {
                failures.push(error);
            }
        }
        debug!(container = self.name(), "disposing");

        let children = self.children.read().clone();
        for child in children.iter().rev() {
            if let Err(error) = child.dispose() {
                failures.push(error);
            }
        }

        let order = self.instantiation_order.read().clone();
        for key in order.iter().rev() {
            if let Some(adapter) = self.adapter_by_key(key) {
                if let Err(error) = self.invoke_lifecycle(&me, &adapter, LifecyclePhase::Dispose)
                {
                    failures.push(error);
                }
            }
        }
        // caches of never-instantiated adapters are empty, but flush anyway
        let adapters = self.adapters.read().clone();
        for adapter in adapters {
            adapter.flush();
        }

        *self.state.write() = ContainerState::Disposed;
        if failures.is_empty() {
            Ok(())
        } else {
            warn!(
                container = self.name(),
                failures = failures.len(),
                "dispose completed with failures"
            );
            Err(ContainerError::aggregate("dispose", failures))
        }
    }

    // ---- validation -------------------------------------------------------

    /// Walk every adapter's dependency requirements: report unsatisfiable
    /// and ambiguous slots, then check the resulting graph for cycles.
    pub fn validate(&self) -> Result<(), ContainerError> {
        let me = self.strong()?;
        let mut problems = Vec::new();
        let mut graph = DependencyGraph::new();
        let monitor = self.monitor.read().clone();

        let adapters = self.adapters.read().clone();
        for adapter in adapters {
            let ctx = ResolutionContext {
                container: &me,
                requester: Some(adapter.key().clone()),
                component_label: adapter.impl_type().name().to_string(),
                monitor: monitor.clone(),
            };
            for request in adapter.dependencies() {
                match locate(&request.parameter, &request.slot, &ctx) {
                    Ok(Resolved::One { owner, adapter: target }) => {
                        if Arc::ptr_eq(&owner, &me) {
                            graph.add_edge(
                                adapter.key().clone(),
                                target.key().clone(),
                                adapter.impl_type().name(),
                                target.impl_type().name(),
                            );
                        }
                    }
                    Ok(Resolved::Many { owner, adapters }) => {
                        if Arc::ptr_eq(&owner, &me) {
                            for target in adapters {
                                graph.add_edge(
                                    adapter.key().clone(),
                                    target.key().clone(),
                                    adapter.impl_type().name(),
                                    target.impl_type().name(),
                                );
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(error) => problems.push(error),
                }
            }
        }

        if let Err(error) = graph.ensure_acyclic() {
            problems.push(error);
        }

        match problems.len() {
            0 => Ok(()),
            1 => Err(problems.remove(0)),
            _ => Err(ContainerError::aggregate("validate", problems)),
        }
    }

    // ---- internals --------------------------------------------------------

    pub(crate) fn strong(&self) -> Result<Arc<Container>, ContainerError> {
        self.self_ref.upgrade().ok_or_else(|| {
            ContainerError::lifecycle_violation("resolve", self.name(), self.state())
        })
    }

    pub(crate) fn adapter_by_key(&self, key: &ComponentKey) -> Option<Arc<Adapter>> {
        self.by_key.read().get(key).cloned()
    }

    pub(crate) fn local_candidates(
        &self,
        view: TypeKey,
        exclude: Option<&ComponentKey>,
    ) -> Vec<Arc<Adapter>> {
        self.adapters
            .read()
            .iter()
            .filter(|adapter| {
                adapter.provides(&view) && exclude.map_or(true, |key| adapter.key() != key)
            })
            .cloned()
            .collect()
    }

    pub(crate) fn find_by_key_chain(
        &self,
        key: &ComponentKey,
    ) -> Option<(Arc<Container>, Arc<Adapter>)> {
        if let Some(adapter) = self.adapter_by_key(key) {
            return self.strong().ok().map(|me| (me, adapter));
        }
        self.parent().and_then(|parent| parent.find_by_key_chain(key))
    }

    /// Produce through the adapter chain and expose the requested view.
    pub(crate) fn instance_as_internal(
        &self,
        adapter: &Arc<Adapter>,
        view: TypeKey,
    ) -> Result<Instance, ContainerError> {
        if !adapter.allows_view(&view) {
            return Err(ContainerError::ViewDenied {
                key: adapter.key().clone(),
                view: view.name().to_string(),
            });
        }
        let base = self.produce_base(adapter)?;
        adapter.cast_view(&view, &base)
    }

    pub(crate) fn produce_base(
        &self,
        adapter: &Arc<Adapter>,
    ) -> Result<Instance, ContainerError> {
        let me = self.strong()?;
        let _guard = enter_resolution(adapter.key(), self.config.max_resolution_depth)?;
        let ctx = ResolutionContext {
            container: &me,
            requester: Some(adapter.key().clone()),
            component_label: adapter.impl_type().name().to_string(),
            monitor: self.monitor.read().clone(),
        };
        self.metrics.record_resolution();
        match adapter.produce(&ctx) {
            Ok(instance) => {
                self.record_instantiated(adapter.key());
                Ok(instance)
            }
            Err(error) => {
                self.metrics.record_failure();
                Err(error)
            }
        }
    }

    fn record_instantiated(&self, key: &ComponentKey) {
        let mut order = self.instantiation_order.write();
        if !order.iter().any(|entry| entry == key) {
            order.push(key.clone());
        }
    }

    fn lifecycle_eligible(&self, adapter: &Arc<Adapter>) -> bool {
        self.policy.has_lifecycle(adapter.spec()) && adapter.has_instance_lifecycle()
    }

    fn invoke_lifecycle(
        &self,
        me: &Arc<Container>,
        adapter: &Arc<Adapter>,
        phase: LifecyclePhase,
    ) -> Result<(), ContainerError> {
        let monitor = self.monitor.read().clone();
        let started_at = Instant::now();
        let result = match phase {
            LifecyclePhase::Start => {
                let ctx = ResolutionContext {
                    container: me,
                    requester: Some(adapter.key().clone()),
                    component_label: adapter.impl_type().name().to_string(),
                    monitor: monitor.clone(),
                };
                adapter.start(&ctx, self.policy.as_ref())
            }
            LifecyclePhase::Stop => adapter.stop(self.policy.as_ref()),
            LifecyclePhase::Dispose => adapter.dispose(self.policy.as_ref()),
        };
        match result {
            Ok(()) => {
                monitor.lifecycle_invoked(adapter.key(), phase, started_at.elapsed());
                Ok(())
            }
            Err(error) => {
                monitor.lifecycle_failed(adapter.key(), phase, &error);
                Err(error)
            }
        }
    }

    fn ensure_not_started(&self, operation: &str) -> Result<(), ContainerError> {
        let state = self.state();
        if state == ContainerState::NotStarted {
            Ok(())
        } else {
            Err(ContainerError::lifecycle_violation(
                operation,
                self.name(),
                state,
            ))
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("adapters", &self.adapters.read().len())
            .field("children", &self.children.read().len())
            .finish()
    }
}
