//! # Core Runtime
//!
//! Shared runtime infrastructure for the Scansync workspace: logging
//! initialization and the common runtime error type.
//!
//! Crates in the workspace use [`logging::init_logging`] once at startup
//! and `tracing` macros everywhere else.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
