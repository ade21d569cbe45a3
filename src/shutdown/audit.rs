// Logger capability used for the shutdown audit trail

use tracing::Level;

/// Target used for audit records emitted through [`TracingLogger`]
pub const AUDIT_TARGET: &str = "vigil::audit";

/// Leveled, structured log emission
pub trait AuditLogger: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]);

    fn info(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::INFO, message, fields);
    }

    fn error(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::ERROR, message, fields);
    }
}

/// Forwards audit records to the global `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl AuditLogger for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]) {
        let fields = format_fields(fields);
        match level {
            Level::ERROR => tracing::error!(target: AUDIT_TARGET, fields = %fields, "{}", message),
            Level::WARN => tracing::warn!(target: AUDIT_TARGET, fields = %fields, "{}", message),
            Level::INFO => tracing::info!(target: AUDIT_TARGET, fields = %fields, "{}", message),
            Level::DEBUG => tracing::debug!(target: AUDIT_TARGET, fields = %fields, "{}", message),
            _ => tracing::trace!(target: AUDIT_TARGET, fields = %fields, "{}", message),
        }
    }
}

// tracing needs field names at compile time, so dynamic pairs are flattened
fn format_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={:?}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}
