//! Texts shown in the error banner

pub const CONNECT_FAILED: &str = "Error: Connection to node failed. Try another one.";
pub const DISCONNECT_FAILED: &str = "Error: Failed to disconnect.";
pub const CONNECTION_STATUS_FAILED: &str = "Error: Failed to fetch connection status.";
pub const CONNECTION_STATISTICS_FAILED: &str = "Error: Failed to fetch connection statistics.";

/// Error recorded in telemetry for failed attempts
pub const CONNECT_FAILED_EVENT_ERROR: &str = "Error: Connection to node failed.";
