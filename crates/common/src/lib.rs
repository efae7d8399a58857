pub mod logging;
pub mod test_utils;

pub use logging::{init_logging, LogFormat, LoggingConfig, OperationTimer};
