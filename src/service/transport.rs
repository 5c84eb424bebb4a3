//! Syslog transports.
//!
//! This module provides:
//! - `UnixSyslog`: RFC 3164 datagrams to the local syslog socket
//! - `MemoryTransport`: records messages in memory, for tests and embedding
//! - `NullTransport`: discards everything

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{Facility, Severity};

/// Destination for messages routed to syslog.
pub trait Transport: Send {
    /// Open (or reopen) the transport for an identity and facility.
    fn open(&mut self, identity: &str, facility: Facility) -> io::Result<()>;

    /// Deliver one message.
    fn send(&mut self, severity: Severity, message: &str) -> io::Result<()>;

    /// Release the underlying connection. Idempotent.
    fn close(&mut self);
}

/// Transport used when none is given explicitly.
pub fn default_transport() -> Box<dyn Transport> {
    #[cfg(unix)]
    {
        Box::new(UnixSyslog::new())
    }
    #[cfg(not(unix))]
    {
        Box::new(NullTransport)
    }
}

#[cfg(unix)]
pub use unix::UnixSyslog;

#[cfg(unix)]
mod unix {
    use std::io;
    use std::os::unix::net::UnixDatagram;

    use time::macros::format_description;
    use time::OffsetDateTime;

    use super::Transport;
    use crate::domain::{Facility, Severity};

    /// Local syslog socket candidates, in order.
    const SOCKET_PATHS: &[&str] = &["/dev/log", "/var/run/syslog", "/var/run/log"];

    /// Writes RFC 3164 datagrams to the local syslog daemon.
    pub struct UnixSyslog {
        socket: Option<UnixDatagram>,
        identity: String,
        facility: Facility,
        pid: u32,
    }

    impl UnixSyslog {
        pub fn new() -> Self {
            Self {
                socket: None,
                identity: String::new(),
                facility: Facility::User,
                pid: std::process::id(),
            }
        }

        fn format(&self, severity: Severity, message: &str) -> io::Result<String> {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            let stamp = now
                .format(format_description!(
                    "[month repr:short] [day padding:space] [hour]:[minute]:[second]"
                ))
                .map_err(io::Error::other)?;
            let pri = self.facility.code() | u16::from(severity.code());
            Ok(format!(
                "<{}>{} {}[{}]: {}",
                pri, stamp, self.identity, self.pid, message
            ))
        }
    }

    impl Default for UnixSyslog {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UnixSyslog {
        fn open(&mut self, identity: &str, facility: Facility) -> io::Result<()> {
            self.close();
            self.identity = identity.to_string();
            self.facility = facility;

            let socket = UnixDatagram::unbound()?;
            let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no syslog socket found");
            for path in SOCKET_PATHS {
                match socket.connect(path) {
                    Ok(()) => {
                        self.socket = Some(socket);
                        return Ok(());
                    }
                    Err(e) => last_err = e,
                }
            }
            Err(last_err)
        }

        fn send(&mut self, severity: Severity, message: &str) -> io::Result<()> {
            let line = self.format(severity, message)?;
            match &self.socket {
                Some(socket) => socket.send(line.as_bytes()).map(|_| ()),
                None => Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "syslog transport not open",
                )),
            }
        }

        fn close(&mut self) {
            self.socket = None;
        }
    }

}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn open(&mut self, _identity: &str, _facility: Facility) -> io::Result<()> {
        Ok(())
    }

    fn send(&mut self, _severity: Severity, _message: &str) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) {}
}

/// One message captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogRecord {
    pub identity: String,
    pub facility: Facility,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    open: Option<(String, Facility)>,
    opens: usize,
    closes: usize,
    records: Vec<SyslogRecord>,
}

/// In-memory transport. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far.
    pub fn records(&self) -> Vec<SyslogRecord> {
        self.state.lock().records.clone()
    }

    /// Number of times `open` was called.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of times an open transport was closed.
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open.is_some()
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, identity: &str, facility: Facility) -> io::Result<()> {
        let mut state = self.state.lock();
        state.open = Some((identity.to_string(), facility));
        state.opens += 1;
        Ok(())
    }

    fn send(&mut self, severity: Severity, message: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        let Some((identity, facility)) = state.open.clone() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory transport not open",
            ));
        };
        state.records.push(SyslogRecord {
            identity,
            facility,
            severity,
            message: message.to_string(),
        });
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open.take().is_some() {
            state.closes += 1;
        }
    }
}
