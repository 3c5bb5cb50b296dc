//! Diagnostic logging for the delivery pipeline.
//!
//! Asynchronous delivery failures and queue drops are invisible to the
//! caller of notify; they surface only through the [`Logger`] sink
//! configured on the client. The default sink forwards to `tracing`.

use std::fmt;

/// Fire-and-forget diagnostic sink.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}

/// Default logger, emitting through the `tracing` error macro under the
/// `faultline` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::error!(target: "faultline", "{message}");
    }
}
