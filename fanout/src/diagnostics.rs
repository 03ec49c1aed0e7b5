//! Diagnostic sinks for batch tracing.
//!
//! Every batch emits one trace line listing the keys it is about to process.
//! Where that line goes is decided by the caller: the executor only knows the
//! [`DiagnosticSink`] it was given. Sinks cannot fail, so tracing never
//! changes the outcome of a batch.

/// Receiver of trace-level diagnostic messages.
pub trait DiagnosticSink: Send + Sync {
    fn trace(&self, message: &str);
}

/// Sink that discards everything. This is the default for every executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn trace(&self, _message: &str) {}
}

/// Sink that forwards messages to the [`log`] facade at trace level.
#[derive(Debug, Clone)]
pub struct LogSink {
    target: String,
}

impl LogSink {
    pub const DEFAULT_TARGET: &'static str = "fanout::batch";

    pub fn new() -> Self {
        Self::with_target(Self::DEFAULT_TARGET)
    }

    /// Create a sink logging under a custom target, e.g. the calling module's path
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for LogSink {
    fn trace(&self, message: &str) {
        log::trace!(target: self.target.as_str(), "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_null_sink_accepts_messages() {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(NullSink);
        sink.trace("getting resources: a,b,c");
    }

    #[test]
    fn test_log_sink_targets() {
        assert_eq!(LogSink::default().target(), "fanout::batch");
        assert_eq!(LogSink::with_target("chef::nodes").target(), "chef::nodes");

        // No logger installed: forwarding must still be a no-op, not a failure
        LogSink::new().trace("deleting resources: n1");
    }
}
