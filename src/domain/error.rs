//! Error types for daemon-support.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the configuration registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The defaults populator passed to `init` reported failure
    #[error("defaults populator failed: {0}")]
    Populator(#[source] anyhow::Error),

    /// The configuration file could not be read
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid INI
    #[error("syntax error in {} at line {line}: {content}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// An iteration callback asked to stop early
    #[error("iteration aborted by callback")]
    IterationAborted,
}

impl ConfigError {
    /// Whether this error reports a failed `load`.
    pub fn is_load_error(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Parse { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConfigError>;
