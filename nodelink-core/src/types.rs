//! Shared data types of the daemon control API
//!
//! These mirror the JSON documents exchanged with the node daemon and the
//! values held by the connection store.

use serde::{Deserialize, Serialize};

/// Connection status as reported by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Not connected
    NotConnected,

    /// Attempting to establish connection
    Connecting,

    /// Successfully connected
    Connected,

    /// Disconnecting
    Disconnecting,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::NotConnected
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::NotConnected => write!(f, "not connected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Remote endpoint selected for a connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl Provider {
    pub fn new(id: impl Into<String>, country: Option<String>) -> Self {
        Self {
            id: id.into(),
            country,
        }
    }
}

/// Location of the consumer as seen from outside
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerLocation {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub asn: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Traffic counters of the current session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatistics {
    /// Session duration in seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub bytes_received: u64,
    #[serde(default)]
    pub bytes_sent: u64,
}

/// Public IP as seen by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIp {
    pub ip: String,
}

/// Body of a connection create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub consumer_id: String,
    pub provider_id: String,
    pub service_type: String,
}

/// Daemon answer to connection create/status requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusResponse {
    pub status: ConnectionStatus,
    #[serde(default)]
    pub session_id: Option<String>,
}
