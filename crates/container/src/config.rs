//! Container configuration.
//!
//! Presets mirror the environments the workspace is deployed in; `validate`
//! returns a report instead of failing on the first problem so a bad config
//! file can be fixed in one pass.

use serde::{Deserialize, Serialize};

use crate::behaviors::{validate_chain, BehaviorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Name used in log records and lifecycle errors.
    pub name: String,
    /// Run graph validation as part of `start`.
    pub validate_on_start: bool,
    /// Record resolution counters.
    pub collect_metrics: bool,
    /// Upper bound on nested resolution depth.
    pub max_resolution_depth: usize,
    /// Behavior chain applied to registrations that do not choose their own.
    pub default_behaviors: Vec<BehaviorKind>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl ContainerConfig {
    pub fn production() -> Self {
        Self {
            name: "root".to_string(),
            validate_on_start: true,
            collect_metrics: true,
            max_resolution_depth: 64,
            default_behaviors: vec![BehaviorKind::Locking, BehaviorKind::Caching],
        }
    }

    pub fn development() -> Self {
        Self {
            name: "dev".to_string(),
            validate_on_start: true,
            collect_metrics: true,
            max_resolution_depth: 64,
            default_behaviors: vec![BehaviorKind::Caching],
        }
    }

    pub fn test() -> Self {
        Self {
            name: "test".to_string(),
            validate_on_start: false,
            collect_metrics: false,
            max_resolution_depth: 32,
            default_behaviors: vec![BehaviorKind::Caching],
        }
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.name.trim().is_empty() {
            report.errors.push("container name is empty".to_string());
        }
        if self.max_resolution_depth == 0 {
            report
                .errors
                .push("max_resolution_depth must be at least 1".to_string());
        } else if self.max_resolution_depth < 8 {
            report.warnings.push(format!(
                "max_resolution_depth of {} will reject moderately deep graphs",
                self.max_resolution_depth
            ));
        }
        if let Err(err) = validate_chain(&self.default_behaviors) {
            report.errors.push(err.to_string());
        }
        if !self.default_behaviors.contains(&BehaviorKind::Caching) {
            report.warnings.push(
                "default chain has no caching; components with lifecycle will not be started"
                    .to_string(),
            );
        }

        report
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
