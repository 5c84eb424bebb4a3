//! Syslog / stderr logging facility.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::transport::{default_transport, Transport};
use crate::config::ConfigRegistry;
use crate::domain::{Facility, Severity};

pub const LOG_STDERR_KEY: &str = "log:stderr";
pub const LOG_SYSLOG_KEY: &str = "log:syslog";
pub const LOG_LEVEL_KEY: &str = "log:level";
pub const LOG_FACILITY_KEY: &str = "log:facility";
pub const LOG_IDENT_KEY: &str = "log:ident";

/// Effective logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub identity: String,
    pub level: Severity,
    pub facility: Facility,
    pub use_syslog: bool,
    pub use_stderr: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            identity: "(unknown)".to_string(),
            level: Severity::Notice,
            facility: Facility::Daemon,
            use_syslog: true,
            use_stderr: false,
        }
    }
}

impl LogSettings {
    /// Derive settings from the `log:*` configuration keys.
    pub fn from_registry(registry: &ConfigRegistry) -> Self {
        Self {
            use_stderr: registry.get_bool(LOG_STDERR_KEY, false),
            use_syslog: registry.get_bool(LOG_SYSLOG_KEY, true),
            level: registry.with_value(LOG_LEVEL_KEY, Some("notice"), |v| {
                Severity::parse(v.unwrap_or("notice"))
            }),
            facility: registry.with_value(LOG_FACILITY_KEY, Some("user"), |v| {
                Facility::parse(v.unwrap_or("user"))
            }),
            identity: registry.get_string(LOG_IDENT_KEY, "(none)"),
        }
    }
}

struct LoggerState {
    settings: LogSettings,
    use_config: bool,
    is_open: bool,
    transport: Box<dyn Transport>,
    stderr: Box<dyn Write + Send>,
}

impl LoggerState {
    fn open(&mut self, registry: &ConfigRegistry) {
        if self.is_open {
            self.reset();
        }
        if self.use_config {
            self.settings = LogSettings::from_registry(registry);
        }
        if self.settings.use_syslog {
            // Best effort: messages are dropped if the daemon is unreachable
            let _ = self
                .transport
                .open(&self.settings.identity, self.settings.facility);
        }
        self.is_open = true;
    }

    fn reset(&mut self) {
        if self.is_open && self.settings.use_syslog {
            self.transport.close();
        }
        self.is_open = false;
    }
}

/// Logging facility routing messages to syslog and/or standard error.
///
/// Settings are either set explicitly or, with
/// [`Logger::set_use_config_source`], pulled from a [`ConfigRegistry`] the
/// next time the transport opens. The transport opens lazily on the first
/// emitted message and every setter closes it again.
pub struct Logger {
    registry: Arc<ConfigRegistry>,
    state: Mutex<LoggerState>,
}

impl Logger {
    /// Create a logger writing to the system syslog and the process stderr.
    pub fn new(registry: Arc<ConfigRegistry>) -> Self {
        Self::with_transport(registry, default_transport(), Box::new(io::stderr()))
    }

    /// Create a logger with an explicit syslog transport and stderr sink.
    pub fn with_transport(
        registry: Arc<ConfigRegistry>,
        transport: Box<dyn Transport>,
        stderr: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            registry,
            state: Mutex::new(LoggerState {
                settings: LogSettings::default(),
                use_config: false,
                is_open: false,
                transport,
                stderr,
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut LogSettings)) {
        let mut state = self.state.lock();
        // Close with the settings the transport was opened with
        state.reset();
        f(&mut state.settings);
        state.use_config = false;
    }

    pub fn set_identity(&self, identity: &str) {
        self.update(|s| s.identity = identity.to_string());
    }

    pub fn set_level(&self, level: Severity) {
        self.update(|s| s.level = level);
    }

    pub fn set_facility(&self, facility: Facility) {
        self.update(|s| s.facility = facility);
    }

    pub fn set_use_stderr(&self, enabled: bool) {
        self.update(|s| s.use_stderr = enabled);
    }

    pub fn set_use_syslog(&self, enabled: bool) {
        self.update(|s| s.use_syslog = enabled);
    }

    /// Take settings from the registry on the next open.
    ///
    /// Only an actual change resets the transport.
    pub fn set_use_config_source(&self, enabled: bool) {
        let mut state = self.state.lock();
        if state.use_config != enabled {
            state.use_config = enabled;
            state.reset();
        }
    }

    pub fn uses_config_source(&self) -> bool {
        self.state.lock().use_config
    }

    /// Whether the transport is currently open.
    pub fn is_open(&self) -> bool {
        self.state.lock().is_open
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> LogSettings {
        self.state.lock().settings.clone()
    }

    /// Close the transport. It reopens on the next message.
    pub fn reset(&self) {
        self.state.lock().reset();
    }

    /// Emit a message.
    ///
    /// Messages less severe than the configured level are dropped. Delivery
    /// errors are ignored.
    pub fn emit(&self, severity: Severity, message: &str) {
        let mut state = self.state.lock();
        if !state.is_open {
            state.open(&self.registry);
        }
        if severity > state.settings.level {
            return;
        }

        let message = message.strip_suffix('\n').unwrap_or(message);
        let LoggerState {
            settings,
            transport,
            stderr,
            ..
        } = &mut *state;

        if settings.use_syslog {
            let _ = transport.send(severity, message);
        }
        if settings.use_stderr {
            let _ = writeln!(
                stderr,
                "{}: {}{}",
                settings.identity,
                severity.stderr_label(),
                message
            );
        }
    }

    /// Emit pre-formatted arguments, see the [`emit!`](crate::emit) macro.
    pub fn emit_fmt(&self, severity: Severity, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(message) => self.emit(severity, message),
            None => self.emit(severity, &args.to_string()),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Logger")
            .field("settings", &state.settings)
            .field("use_config", &state.use_config)
            .field("is_open", &state.is_open)
            .finish_non_exhaustive()
    }
}

/// Format and emit a message through a [`Logger`].
///
/// ```ignore
/// emit!(logger, Severity::Warning, "retrying in {}s", delay);
/// ```
#[macro_export]
macro_rules! emit {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {
        $logger.emit_fmt($severity, format_args!($($arg)+))
    };
}
