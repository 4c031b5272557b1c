//! # RepoHub Observe - Structured Logging
//!
//! Logging setup for the service binary and tests.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};
