//! Diagnostics sink
//!
//! Every error, warning and info message produced by the database goes
//! through an injected [`DiagnosticSink`]. The default sink forwards to
//! `tracing`; [`CollectingSink`] keeps messages for tests and reports.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One reported message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => f.write_str(&self.message),
            Severity::Warning => write!(f, "  -> Warning: {}", self.message),
            Severity::Error => write!(f, "  -> Error: {}", self.message),
        }
    }
}

/// Receiver of database diagnostics
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => tracing::info!(target: "fmdb", "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(target: "fmdb", "{}", diagnostic.message),
            Severity::Error => tracing::error!(target: "fmdb", "{}", diagnostic.message),
        }
    }
}

/// Keeps every diagnostic in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().clone()
    }

    /// Drain the collected diagnostics
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Messages at or above `severity`
    #[must_use]
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.inner
            .lock()
            .iter()
            .filter(|d| d.severity >= severity)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Check whether any message contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.inner.lock().iter().any(|d| d.message.contains(needle))
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!(target: "fmdb", severity = ?diagnostic.severity, "{}", diagnostic.message);
        self.inner.lock().push(diagnostic);
    }
}
