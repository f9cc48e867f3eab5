//! Sinks for the dispatcher's diagnostic messages.

/// Receives diagnostics from the dispatcher.
pub trait ErrorLog: Send + Sync {
    fn error(&self, message: &str);

    /// Raw response bodies. Dropped unless overridden.
    fn debug(&self, _message: &str) {}
}

/// Prints to standard output. Used when no logger is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutLog;

impl ErrorLog for StdoutLog {
    fn error(&self, message: &str) {
        println!("{message}");
    }
}

/// Forwards messages to `tracing::error!`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

#[cfg(feature = "tracing")]
impl ErrorLog for TracingLog {
    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}
