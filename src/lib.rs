//! daemon-support: configuration and logging for daemons
//!
//! A layered INI configuration registry (overrides, loaded file, defaults)
//! with thread-safe typed accessors, and a logging facility that routes
//! messages to syslog and/or standard error, configured explicitly or from
//! the registry.
//!
//! ```no_run
//! use daemon_support::{Context, Severity};
//!
//! let ctx = Context::new();
//! ctx.config()
//!     .init(Some(|c: &daemon_support::ConfigRegistry| -> anyhow::Result<()> {
//!         c.set_default("log:level", "info");
//!         Ok(())
//!     }))?;
//! ctx.config().set_override("log:stderr", "yes");
//! ctx.config().load("/etc/mydaemon.conf")?;
//! ctx.log().set_use_config_source(true);
//! ctx.log().emit(Severity::Notice, "started");
//! # Ok::<(), daemon_support::ConfigError>(())
//! ```

pub mod config;
pub mod domain;
pub mod service;

use std::io::Write;
use std::sync::{Arc, OnceLock};

pub use config::{ConfigRegistry, Populator, SectionIter, Store};
pub use domain::logger::{install, LoggerLayer};
pub use domain::{ConfigError, Facility, Result, Severity};
pub use service::{LogSettings, Logger, Transport};

/// A configuration registry and a logger wired to it.
///
/// Dropping the context closes the logger's transport.
#[derive(Debug)]
pub struct Context {
    config: Arc<ConfigRegistry>,
    log: Arc<Logger>,
}

impl Context {
    /// Create a context logging to the system syslog and stderr.
    pub fn new() -> Self {
        let config = Arc::new(ConfigRegistry::new());
        let log = Arc::new(Logger::new(Arc::clone(&config)));
        Self { config, log }
    }

    /// Create a context with an explicit syslog transport and stderr sink.
    pub fn with_transport(transport: Box<dyn Transport>, stderr: Box<dyn Write + Send>) -> Self {
        let config = Arc::new(ConfigRegistry::new());
        let log = Arc::new(Logger::with_transport(Arc::clone(&config), transport, stderr));
        Self { config, log }
    }

    /// Process-wide context, created on first use.
    pub fn global() -> &'static Context {
        static GLOBAL: OnceLock<Context> = OnceLock::new();
        GLOBAL.get_or_init(Context::new)
    }

    pub fn config(&self) -> &Arc<ConfigRegistry> {
        &self.config
    }

    pub fn log(&self) -> &Arc<Logger> {
        &self.log
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.log.reset();
    }
}
