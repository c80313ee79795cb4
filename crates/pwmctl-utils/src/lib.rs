//! # pwmctl utilities
//!
//! Shared helpers for the pwmctl workspace, currently the `tracing` based
//! logging setup.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, init_with_config, LogConfig, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
