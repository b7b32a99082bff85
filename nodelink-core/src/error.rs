//! Error types for the nodelink client
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// HTTP status the daemon answers with when a pending request was closed
/// because a newer one superseded it.
pub const REQUEST_CLOSED_STATUS: u16 = 499;

/// Main error type for the nodelink application
#[derive(Error, Debug)]
pub enum NodelinkError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors reported by the daemon control API
    #[error("Daemon API error: {0}")]
    Api(#[from] ApiError),

    /// Errors related to connection lifecycle operations
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Connection telemetry used out of order
    #[error("Telemetry error: {0}")]
    Tracker(#[from] TrackerError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Failures of the daemon control API
///
/// `RequestClosed` and `Daemon` are conditions the daemon itself reported and
/// are treated as routine. Everything else is an unexpected failure that gets
/// escalated to diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request was closed by the daemon")]
    RequestClosed,

    #[error("Daemon responded with status {status}: {message}")]
    Daemon { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Failed to decode daemon response: {reason}")]
    Decode { reason: String },
}

impl ApiError {
    /// Whether the daemon reported this condition itself
    pub fn is_expected(&self) -> bool {
        matches!(self, ApiError::RequestClosed | ApiError::Daemon { .. })
    }

    /// Whether the request was superseded by a newer one
    pub fn is_request_closed(&self) -> bool {
        matches!(self, ApiError::RequestClosed)
    }
}

/// Connection lifecycle errors caused by misuse rather than remote failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Last provider not set")]
    NoPriorProvider,

    #[error("Consumer identity not set")]
    NoIdentity,

    #[error("Unknown looper action: {action}")]
    UnknownAction { action: String },
}

/// Connection telemetry precondition failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("connect start not marked")]
    ConnectNotStarted,
}

/// Telemetry transport failures
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to deliver events: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Collector rejected events with status {status}")]
    Rejected { status: u16 },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NodelinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_classification() {
        assert!(ApiError::RequestClosed.is_expected());
        assert!(ApiError::Daemon {
            status: 409,
            message: "already connected".to_string()
        }
        .is_expected());
        assert!(!ApiError::Timeout.is_expected());
        assert!(!ApiError::Network {
            reason: "refused".to_string()
        }
        .is_expected());
        assert!(!ApiError::Decode {
            reason: "eof".to_string()
        }
        .is_expected());
    }

    #[test]
    fn test_request_closed_is_only_superseded_kind() {
        assert!(ApiError::RequestClosed.is_request_closed());
        assert!(!ApiError::Daemon {
            status: REQUEST_CLOSED_STATUS,
            message: String::new()
        }
        .is_request_closed());
    }
}
