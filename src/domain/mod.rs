//! Domain layer containing the shared types.
//!
//! This module contains:
//! - Error types
//! - Syslog severity and facility
//! - The `tracing` bridge into the logging facility

mod error;
pub mod logger;
mod types;

pub use error::{ConfigError, Result};
pub use types::{Facility, Severity};
