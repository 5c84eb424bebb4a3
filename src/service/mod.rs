//! Service layer: the logging facility and its transports.

mod logger;
mod transport;

pub use logger::{
    LogSettings, Logger, LOG_FACILITY_KEY, LOG_IDENT_KEY, LOG_LEVEL_KEY, LOG_STDERR_KEY,
    LOG_SYSLOG_KEY,
};
#[cfg(unix)]
pub use transport::UnixSyslog;
pub use transport::{default_transport, MemoryTransport, NullTransport, SyslogRecord, Transport};
