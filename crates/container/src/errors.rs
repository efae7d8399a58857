//! Error taxonomy for the container engine.
//!
//! Conditions are split the way callers need to react to them: composition
//! problems surface at registration time, resolution problems carry enough
//! context (key, type, candidate list) to be actionable without a debugger,
//! and teardown problems are aggregated so a failing component cannot abort
//! the rest of the cascade.

use thiserror::Error;

use crate::key::ComponentKey;
use crate::lifecycle::ContainerState;

fn summarize(failures: &[ContainerError]) -> String {
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error, Clone)]
pub enum ContainerError {
    /// A key may be registered once per container.
    #[error("duplicate key '{key}': component already registered")]
    DuplicateKey { key: ComponentKey },

    /// Malformed registration detected while the adapter was being built.
    #[error("malformed registration for '{key}': {reason}")]
    Composition { key: ComponentKey, reason: String },

    /// Behavior decorators composed in an unsupported order or shape.
    #[error("invalid behavior chain: {reason}")]
    InvalidChain { reason: String },

    /// More than one local candidate matched a scalar dependency slot.
    #[error("ambiguous dependency '{requested}' for '{component}': candidates in registration order: {}", .candidates.join(", "))]
    AmbiguousResolution {
        requested: String,
        component: String,
        candidates: Vec<String>,
    },

    /// No candidate in this container or any ancestor.
    #[error("unsatisfiable dependency '{requested}' for '{component}': no candidate in this container or its ancestors")]
    Unsatisfiable { requested: String, component: String },

    /// An explicit key resolved to nothing.
    #[error("no component registered for key '{key}'")]
    NoSuchComponent { key: ComponentKey },

    /// The resolution re-entered an adapter already being resolved.
    #[error("cyclic dependency detected: {path}")]
    CyclicDependency { path: String },

    /// Runaway recursion guard.
    #[error("resolution depth limit of {limit} exceeded while resolving '{component}'")]
    DepthExceeded { limit: usize, component: String },

    /// Operation not permitted in the container's current state.
    #[error("cannot {operation} while container '{name}' is {state}")]
    LifecycleViolation {
        operation: String,
        name: String,
        state: ContainerState,
    },

    /// A build closure or lifecycle callback reported failure.
    #[error("instantiation of '{component}' failed: {reason}")]
    Instantiation { component: String, reason: String },

    /// The implementation-hiding behavior refused to expose this view.
    #[error("'{key}' does not expose view '{view}'")]
    ViewDenied { key: ComponentKey, view: String },

    /// A handle did not carry the expected view.
    #[error("type mismatch for {context}: expected handle of type '{expected}'")]
    TypeMismatch {
        context: String,
        expected: &'static str,
    },

    /// Collected per-component failures from a stop or dispose cascade.
    #[error("{operation} completed with {} failure(s): {}", .failures.len(), summarize(.failures))]
    Aggregate {
        operation: String,
        failures: Vec<ContainerError>,
    },
}

impl ContainerError {
    pub fn composition(key: ComponentKey, reason: impl Into<String>) -> Self {
        ContainerError::Composition {
            key,
            reason: reason.into(),
        }
    }

    pub fn invalid_chain(reason: impl Into<String>) -> Self {
        ContainerError::InvalidChain {
            reason: reason.into(),
        }
    }

    pub fn ambiguous(
        requested: impl Into<String>,
        component: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        ContainerError::AmbiguousResolution {
            requested: requested.into(),
            component: component.into(),
            candidates,
        }
    }

    pub fn unsatisfiable(requested: impl Into<String>, component: impl Into<String>) -> Self {
        ContainerError::Unsatisfiable {
            requested: requested.into(),
            component: component.into(),
        }
    }

    pub fn lifecycle_violation(
        operation: impl Into<String>,
        name: impl Into<String>,
        state: ContainerState,
    ) -> Self {
        ContainerError::LifecycleViolation {
            operation: operation.into(),
            name: name.into(),
            state,
        }
    }

    pub fn instantiation(component: impl Into<String>, reason: impl Into<String>) -> Self {
        ContainerError::Instantiation {
            component: component.into(),
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(context: impl Into<String>, expected: &'static str) -> Self {
        ContainerError::TypeMismatch {
            context: context.into(),
            expected,
        }
    }

    pub fn aggregate(operation: impl Into<String>, failures: Vec<ContainerError>) -> Self {
        ContainerError::Aggregate {
            operation: operation.into(),
            failures,
        }
    }

    /// Coarse grouping used by log decoration and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            ContainerError::DuplicateKey { .. }
            | ContainerError::Composition { .. }
            | ContainerError::InvalidChain { .. } => "composition",
            ContainerError::AmbiguousResolution { .. } => "ambiguity",
            ContainerError::Unsatisfiable { .. } | ContainerError::NoSuchComponent { .. } => {
                "unsatisfiable"
            }
            ContainerError::CyclicDependency { .. } | ContainerError::DepthExceeded { .. } => {
                "cycle"
            }
            ContainerError::LifecycleViolation { .. } => "lifecycle",
            ContainerError::Instantiation { .. } => "instantiation",
            ContainerError::ViewDenied { .. } | ContainerError::TypeMismatch { .. } => "typing",
            ContainerError::Aggregate { .. } => "aggregate",
        }
    }

    /// Whether this error was raised while the registration was being
    /// composed, as opposed to during a lookup or a lifecycle cascade.
    pub fn is_composition(&self) -> bool {
        self.category() == "composition"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_lists_candidates_in_order() {
        let err = ContainerError::ambiguous(
            "dyn Service",
            "Consumer",
            vec!["FirstImpl".to_string(), "SecondImpl".to_string()],
        );
        let text = err.to_string();
        let first = text.find("FirstImpl").expect("first candidate listed");
        let second = text.find("SecondImpl").expect("second candidate listed");
        assert!(first < second);
        assert_eq!(err.category(), "ambiguity");
    }

    #[test]
    fn test_unsatisfiable_names_both_sides() {
        let err = ContainerError::unsatisfiable("DbPool", "Repository");
        let text = err.to_string();
        assert!(text.contains("DbPool"));
        assert!(text.contains("Repository"));
    }

    #[test]
    fn test_lifecycle_violation_mentions_state() {
        let err = ContainerError::lifecycle_violation(
            "unregister component",
            "root",
            ContainerState::Started,
        );
        assert!(err.to_string().contains("started"));
        assert_eq!(err.category(), "lifecycle");
    }

    #[test]
    fn test_aggregate_reports_every_failure() {
        let err = ContainerError::aggregate(
            "dispose",
            vec![
                ContainerError::instantiation("A", "boom"),
                ContainerError::instantiation("B", "bang"),
            ],
        );
        let text = err.to_string();
        assert!(text.contains("2 failure(s)"));
        assert!(text.contains("boom"));
        assert!(text.contains("bang"));
    }

    #[test]
    fn test_composition_probe() {
        assert!(ContainerError::DuplicateKey {
            key: ComponentKey::named("k"),
        }
        .is_composition());
        assert!(!ContainerError::unsatisfiable("T", "C").is_composition());
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err = ContainerError::invalid_chain("caching listed twice");
        let any: anyhow::Error = err.into();
        assert!(any.to_string().contains("caching listed twice"));
    }
}
