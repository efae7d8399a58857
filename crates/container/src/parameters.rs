//! Argument-slot resolution strategies.
//!
//! A [`Parameter`] describes how one constructor or member slot is filled:
//! a fixed value, a component looked up by type or by explicit key, or every
//! matching component as a collection. Parameters are stateless and may be
//! reused across resolutions.
//!
//! Scalar lookup rules, in order: an explicit key resolves exactly that key
//! or fails; otherwise local candidates are collected excluding the adapter
//! currently being resolved, exactly one wins, several is an ambiguity
//! error enumerating the candidates in registration order, and none
//! delegates the whole search to the parent before giving up.

use std::fmt;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::container::Container;
use crate::errors::ContainerError;
use crate::instance::{pack, Instance};
use crate::injector::ResolutionContext;
use crate::key::{Arity, ComponentKey, Slot, TypeKey};

#[derive(Clone)]
pub enum Parameter {
    /// Fixed value supplied at registration time.
    Constant(Instance),
    /// Resolve a matching component; `key` pins the lookup to one
    /// registration instead of searching by slot type.
    Component { key: Option<ComponentKey> },
    /// Resolve every matching local component.
    All { empty_ok: bool },
    /// Marker forcing the zero-argument constructor. Must be the only
    /// parameter of the registration.
    DefaultConstructor,
}

impl Parameter {
    pub fn constant<T: Send + Sync + 'static>(value: T) -> Self {
        Parameter::Constant(pack(Arc::new(value)))
    }

    pub fn component() -> Self {
        Parameter::Component { key: None }
    }

    pub fn component_key(key: impl Into<ComponentKey>) -> Self {
        Parameter::Component {
            key: Some(key.into()),
        }
    }

    /// Collection that must contain at least one element.
    pub fn all() -> Self {
        Parameter::All { empty_ok: false }
    }

    /// Collection that may resolve empty.
    pub fn all_empty_ok() -> Self {
        Parameter::All { empty_ok: true }
    }

    pub fn default_constructor() -> Self {
        Parameter::DefaultConstructor
    }

    /// Default strategy for a slot that got no explicit parameter.
    pub(crate) fn default_for(slot: &Slot) -> Self {
        match slot.arity() {
            Arity::One => Parameter::component(),
            Arity::Many => Parameter::all(),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Constant(_) => f.write_str("Constant"),
            Parameter::Component { key: None } => f.write_str("Component"),
            Parameter::Component { key: Some(k) } => write!(f, "Component({k})"),
            Parameter::All { empty_ok } => write!(f, "All {{ empty_ok: {empty_ok} }}"),
            Parameter::DefaultConstructor => f.write_str("DefaultConstructor"),
        }
    }
}

/// Outcome of locating a slot's provider without instantiating it.
pub(crate) enum Resolved {
    Constant(Instance),
    One {
        owner: Arc<Container>,
        adapter: Arc<Adapter>,
    },
    Many {
        owner: Arc<Container>,
        adapters: Vec<Arc<Adapter>>,
    },
    EmptyMany,
}

/// Locate the provider for one slot. Ambiguity propagates immediately;
/// a miss is reported as an unsatisfiable or no-such-component error that
/// constructor selection may catch while probing alternatives.
pub(crate) fn locate(
    param: &Parameter,
    slot: &Slot,
    ctx: &ResolutionContext<'_>,
) -> Result<Resolved, ContainerError> {
    match param {
        Parameter::Constant(value) => Ok(Resolved::Constant(value.clone())),
        Parameter::DefaultConstructor => Err(ContainerError::composition(
            requester_key(ctx),
            "the zero-argument marker cannot fill an argument slot",
        )),
        Parameter::Component { key: Some(key) } => match ctx.container.find_by_key_chain(key) {
            Some((owner, adapter)) => {
                if adapter.provides(&slot.expects()) {
                    Ok(Resolved::One { owner, adapter })
                } else {
                    Err(ContainerError::unsatisfiable(
                        format!(
                            "{} (key '{}' produces {})",
                            slot.expects(),
                            key,
                            adapter.impl_type()
                        ),
                        ctx.component_label.clone(),
                    ))
                }
            }
            None => match ctx.monitor.no_component_found(key) {
                Some(fallback) => Ok(Resolved::Constant(fallback)),
                None => Err(ContainerError::NoSuchComponent { key: key.clone() }),
            },
        },
        Parameter::Component { key: None } => locate_scalar(
            ctx.container,
            slot.expects(),
            ctx.requester.as_ref(),
            &ctx.component_label,
        ),
        Parameter::All { empty_ok } => locate_all(
            ctx.container,
            slot.expects(),
            ctx.requester.as_ref(),
            *empty_ok,
            &ctx.component_label,
        ),
    }
}

/// Scalar search: key-as-type precedence, then local candidates, then the
/// parent chain.
pub(crate) fn locate_scalar(
    container: &Arc<Container>,
    view: TypeKey,
    exclude: Option<&ComponentKey>,
    component_label: &str,
) -> Result<Resolved, ContainerError> {
    // A registration keyed by the requested type wins over a scan.
    if let Some(adapter) = container.adapter_by_key(&ComponentKey::Type(view)) {
        let excluded = exclude.is_some_and(|key| key == adapter.key());
        if !excluded && adapter.provides(&view) {
            return Ok(Resolved::One {
                owner: Arc::clone(container),
                adapter,
            });
        }
    }

    let mut candidates = container.local_candidates(view, exclude);
    match candidates.len() {
        1 => Ok(Resolved::One {
            owner: Arc::clone(container),
            adapter: candidates.remove(0),
        }),
        0 => match container.parent() {
            // The requester lives in the child; no exclusion upward.
            Some(parent) => locate_scalar(&parent, view, None, component_label),
            None => Err(ContainerError::unsatisfiable(
                view.name(),
                component_label.to_string(),
            )),
        },
        _ => Err(ContainerError::ambiguous(
            view.name(),
            component_label.to_string(),
            candidates
                .iter()
                .map(|adapter| adapter.impl_type().name().to_string())
                .collect(),
        )),
    }
}

/// Collection search. Candidates are gathered from one container only; a
/// container with no local opinion delegates the whole search to its parent
/// unless the slot permits emptiness.
pub(crate) fn locate_all(
    container: &Arc<Container>,
    view: TypeKey,
    exclude: Option<&ComponentKey>,
    empty_ok: bool,
    component_label: &str,
) -> Result<Resolved, ContainerError> {
    let candidates = container.local_candidates(view, exclude);
    if !candidates.is_empty() {
        return Ok(Resolved::Many {
            owner: Arc::clone(container),
            adapters: candidates,
        });
    }
    if empty_ok {
        return Ok(Resolved::EmptyMany);
    }
    match container.parent() {
        Some(parent) => locate_all(&parent, view, None, empty_ok, component_label),
        None => Err(ContainerError::unsatisfiable(
            format!("at least one component of {}", view.name()),
            component_label.to_string(),
        )),
    }
}

/// Instantiate a located provider and shape it for the slot.
pub(crate) fn fetch(resolved: Resolved, slot: &Slot) -> Result<Instance, ContainerError> {
    match resolved {
        Resolved::Constant(value) => Ok(value),
        Resolved::One { owner, adapter } => owner.instance_as_internal(&adapter, slot.expects()),
        Resolved::Many { owner, adapters } => {
            let items = adapters
                .iter()
                .map(|adapter| owner.instance_as_internal(adapter, slot.expects()))
                .collect::<Result<Vec<Instance>, _>>()?;
            Ok(pack(Arc::new(items)))
        }
        Resolved::EmptyMany => Ok(pack(Arc::new(Vec::<Instance>::new()))),
    }
}

fn requester_key(ctx: &ResolutionContext<'_>) -> ComponentKey {
    ctx.requester
        .clone()
        .unwrap_or_else(|| ComponentKey::named("<lookup>"))
}
