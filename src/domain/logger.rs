//! Bridge from `tracing` events to the logging facility.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use anyhow::Result;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use super::Severity;
use crate::service::Logger;

/// Initialize the global `tracing` subscriber so events reach `logger`.
///
/// `RUST_LOG` narrows what reaches the layer; the logger's own level still
/// applies on top.
pub fn install(logger: Arc<Logger>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(LoggerLayer::new(logger));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}

/// `tracing_subscriber` layer that forwards each event to a [`Logger`].
pub struct LoggerLayer {
    logger: Arc<Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for LoggerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.logger
            .emit(severity_for(event.metadata().level()), &visitor.finish());
    }
}

/// Map a `tracing` level onto a syslog severity.
pub fn severity_for(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        Level::INFO => Severity::Info,
        _ => Severity::Debug,
    }
}

/// Renders the `message` field followed by the other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigRegistry;
    use crate::service::MemoryTransport;

    fn layered() -> (Arc<Logger>, MemoryTransport) {
        let transport = MemoryTransport::new();
        let logger = Arc::new(Logger::with_transport(
            Arc::new(ConfigRegistry::new()),
            Box::new(transport.clone()),
            Box::new(std::io::sink()),
        ));
        logger.set_identity("bridge");
        logger.set_level(Severity::Debug);
        (logger, transport)
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for(&Level::ERROR), Severity::Error);
        assert_eq!(severity_for(&Level::WARN), Severity::Warning);
        assert_eq!(severity_for(&Level::INFO), Severity::Info);
        assert_eq!(severity_for(&Level::TRACE), Severity::Debug);
    }

    #[test]
    fn test_events_reach_logger() {
        let (logger, transport) = layered();
        let subscriber = tracing_subscriber::registry().with(LoggerLayer::new(Arc::clone(&logger)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(port = 8080, "bind failed");
            tracing::debug!(path = "/etc/x.conf");
        });

        let records = transport.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].severity, Severity::Warning);
        assert_eq!(records[0].message, "bind failed port=8080");
        assert_eq!(records[1].severity, Severity::Debug);
        assert_eq!(records[1].message, "path=/etc/x.conf");
    }
}
