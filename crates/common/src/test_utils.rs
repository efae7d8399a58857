//! Shared test scaffolding for the workspace crates.

use std::sync::{Arc, Mutex};

use crate::logging::{init_logging, LoggingConfig};

/// Install a quiet logging subscriber for tests. Safe to call repeatedly.
pub fn init_test_logging() {
    init_logging(LoggingConfig {
        default_filter: "warn".to_string(),
        ..LoggingConfig::default()
    });
}

/// Records a sequence of string events across threads; used by tests that
/// assert ordering (startup order, teardown order, monitor callbacks).
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        self.calls.lock().expect("recorder poisoned").push(event.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("recorder poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().expect("recorder poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
