// ==============================================================================
// Log Sink: the Injected Logging Capability
// ==============================================================================
//
// The library never writes to stdout/stderr itself. Every component that
// reports progress (the orchestrator, discovery, and the stream drains that
// forward translator output) receives an `Arc<dyn LogSink>`. The binary plugs
// in `TracingSink`; tests and embedders can plug in `MemorySink` to inspect
// what was reported.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a single reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// Destination for informational and error lines produced during a build.
///
/// Implementations must be shareable across threads: stream drains forward
/// child-process output from their own threads.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.log(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Severity::Error, message);
    }
}

/// Shared handle to a log sink.
pub type DynLogSink = Arc<dyn LogSink>;

/// Forwards every line to `tracing` under the `idl2src` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "idl2src", "{message}"),
            Severity::Info => tracing::info!(target: "idl2src", "{message}"),
            Severity::Warn => tracing::warn!(target: "idl2src", "{message}"),
            Severity::Error => tracing::error!(target: "idl2src", "{message}"),
        }
    }
}

/// Records every line in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages logged at exactly `severity`, in arrival order.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any line at `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.messages(severity).iter().any(|m| m.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, severity: Severity, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, message.to_string()));
    }
}
