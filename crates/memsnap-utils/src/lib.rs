//! # memsnap Utilities
//!
//! Shared utilities for the memsnap workspace.
//!
//! Currently this is the logging setup: a `tracing` subscriber configured from
//! CLI flags and environment variables, writing to stderr and optionally to a
//! file.

pub mod logging;

// Re-export commonly used logging items for convenience
pub use logging::{LogConfig, LogFormat, LogLevel, LoggingError, LoggingGuard, init_logging};
pub use tracing::{debug, error, info, trace, warn};
