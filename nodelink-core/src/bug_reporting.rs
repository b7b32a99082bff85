//! Diagnostics reporting
//!
//! Unexpected failures are handed to a [`BugReporter`]. Reporting is fire and
//! forget and never fails the caller.

use tracing::{error, info};

/// Severity attached to a captured failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something failed but the application recovered
    Info,
    /// A failure the user is likely to notice
    Error,
}

/// Receives failures worth investigating
pub trait BugReporter: Send + Sync {
    fn capture_exception(&self, severity: Severity, error: &(dyn std::error::Error + 'static));
}

/// Reports failures to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingBugReporter;

impl BugReporter for TracingBugReporter {
    fn capture_exception(&self, severity: Severity, error: &(dyn std::error::Error + 'static)) {
        let mut chain = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }

        match severity {
            Severity::Info => info!(error = %chain, "Captured exception"),
            Severity::Error => error!(error = %chain, "Captured exception"),
        }
    }
}
