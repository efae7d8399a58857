//! Container and component lifecycle.
//!
//! The container walks a strict state machine:
//! `NotStarted -> Started -> Stopped -> Disposed`, with the one shortcut
//! `Started -> Disposed` (an implicit stop runs first). Invalid transitions
//! are rejected with a lifecycle violation rather than ignored.
//!
//! Which component instances take part in start/stop/dispose is decided by a
//! pluggable [`LifecyclePolicy`] over the [`Lifecycle`] capability that a
//! registration opts into.

use std::fmt;
use std::sync::Arc;

use crate::errors::ContainerError;
use crate::instance::Instance;
use crate::spec::ComponentSpec;

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    NotStarted,
    Started,
    Stopped,
    Disposed,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContainerState::NotStarted => "not started",
            ContainerState::Started => "started",
            ContainerState::Stopped => "stopped",
            ContainerState::Disposed => "disposed",
        };
        f.write_str(text)
    }
}

impl ContainerState {
    /// Valid source states for a `start` transition. A stopped container may
    /// be started again.
    pub fn can_start(&self) -> bool {
        matches!(self, ContainerState::NotStarted | ContainerState::Stopped)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, ContainerState::Started)
    }

    /// `dispose` is reachable from every state; on an already disposed
    /// container it is a no-op rather than an error.
    pub fn can_dispose(&self) -> bool {
        !matches!(self, ContainerState::Disposed)
    }
}

/// Phase of a component lifecycle invocation, for monitor callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Start,
    Stop,
    Dispose,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LifecyclePhase::Start => "start",
            LifecyclePhase::Stop => "stop",
            LifecyclePhase::Dispose => "dispose",
        };
        f.write_str(text)
    }
}

/// Capability a component implements to take part in container lifecycle.
/// Instances are shared handles, so implementations use interior mutability.
pub trait Lifecycle: Send + Sync {
    fn start(&self) -> Result<(), ContainerError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), ContainerError> {
        Ok(())
    }

    fn dispose(&self) -> Result<(), ContainerError> {
        Ok(())
    }
}

/// Decides which registrations receive start/stop/dispose calls.
pub trait LifecyclePolicy: Send + Sync {
    /// Whether instances of this registration have lifecycle at all.
    fn has_lifecycle(&self, spec: &ComponentSpec) -> bool;

    /// Obtain the lifecycle view of a produced instance, if the policy
    /// recognizes one.
    fn lifecycle_of(&self, spec: &ComponentSpec, instance: &Instance)
        -> Option<Arc<dyn Lifecycle>>;
}

/// Recognizes registrations that opted in with
/// [`SpecBuilder::lifecycle`](crate::spec::SpecBuilder::lifecycle).
#[derive(Debug, Default, Clone, Copy)]
pub struct StartableLifecycle;

impl LifecyclePolicy for StartableLifecycle {
    fn has_lifecycle(&self, spec: &ComponentSpec) -> bool {
        spec.declares_lifecycle()
    }

    fn lifecycle_of(
        &self,
        spec: &ComponentSpec,
        instance: &Instance,
    ) -> Option<Arc<dyn Lifecycle>> {
        spec.lifecycle_view(instance)
    }
}

/// Policy under which no component has lifecycle; start/stop/dispose only
/// move the container state machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLifecycle;

impl LifecyclePolicy for NullLifecycle {
    fn has_lifecycle(&self, _spec: &ComponentSpec) -> bool {
        false
    }

    fn lifecycle_of(
        &self,
        _spec: &ComponentSpec,
        _instance: &Instance,
    ) -> Option<Arc<dyn Lifecycle>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_edges() {
        assert!(ContainerState::NotStarted.can_start());
        assert!(ContainerState::Stopped.can_start());
        assert!(!ContainerState::Started.can_start());
        assert!(!ContainerState::Disposed.can_start());

        assert!(ContainerState::Started.can_stop());
        assert!(!ContainerState::NotStarted.can_stop());
        assert!(!ContainerState::Stopped.can_stop());

        assert!(ContainerState::NotStarted.can_dispose());
        assert!(ContainerState::Started.can_dispose());
        assert!(ContainerState::Stopped.can_dispose());
        assert!(!ContainerState::Disposed.can_dispose());
    }

    #[test]
    fn test_state_display_is_lowercase() {
        assert_eq!(ContainerState::NotStarted.to_string(), "not started");
        assert_eq!(ContainerState::Disposed.to_string(), "disposed");
        assert_eq!(LifecyclePhase::Dispose.to_string(), "dispose");
    }
}
