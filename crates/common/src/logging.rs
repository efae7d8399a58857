//! Tracing bootstrap for the workspace.
//!
//! Initialization is idempotent: the first caller installs the global
//! subscriber, later callers get the already-installed configuration. The
//! filter is taken from `RUST_LOG` when present, otherwise from
//! [`LoggingConfig::default_filter`].

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

static INSTALLED: OnceCell<LoggingConfig> = OnceCell::new();

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable single-line output.
    Text,
    /// One JSON object per record, for log shipping.
    Json,
}

/// Logging configuration applied at process startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set, e.g. `"info,container=debug"`.
    pub default_filter: String,
    /// Include the emitting module path in text output.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            default_filter: "info".to_string(),
            with_target: true,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Returns the configuration that is actually in effect, which is the first
/// one ever passed in if another part of the process got there earlier.
pub fn init_logging(config: LoggingConfig) -> &'static LoggingConfig {
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_filter.clone()));

        match config.format {
            LogFormat::Text => {
                let _ = fmt()
                    .with_env_filter(filter)
                    .with_target(config.with_target)
                    .try_init();
            }
            LogFormat::Json => {
                let _ = fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_target(config.with_target)
                    .try_init();
            }
        }
        config
    })
}

/// Guard that logs the elapsed time of an operation when dropped.
pub struct OperationTimer {
    operation: String,
    started: Instant,
}

impl OperationTimer {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        debug!(
            operation = %self.operation,
            elapsed_ms = self.elapsed_ms() as u64,
            "operation finished"
        );
    }
}
