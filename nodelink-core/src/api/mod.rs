//! Node daemon control API
//!
//! The daemon exposes connection management over HTTP on localhost. The rest
//! of the crate talks to it only through [`DaemonApi`].

pub mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{
    ConnectionIp, ConnectionRequest, ConnectionStatistics, ConnectionStatusResponse,
    ConsumerLocation,
};

pub use http::HttpDaemonApi;

/// Remote control capability of the node daemon
#[async_trait]
pub trait DaemonApi: Send + Sync {
    /// Establish a connection to a provider
    async fn connection_create(
        &self,
        request: &ConnectionRequest,
    ) -> Result<ConnectionStatusResponse, ApiError>;

    /// Tear down the current connection
    async fn connection_cancel(&self) -> Result<(), ApiError>;

    /// Current connection status
    async fn connection_status(&self) -> Result<ConnectionStatusResponse, ApiError>;

    /// Traffic counters of the current session
    async fn connection_statistics(&self) -> Result<ConnectionStatistics, ApiError>;

    /// Public IP, optionally bounded by `timeout`
    async fn connection_ip(&self, timeout: Option<Duration>) -> Result<ConnectionIp, ApiError>;

    /// Original consumer location, optionally bounded by `timeout`
    async fn location(&self, timeout: Option<Duration>) -> Result<ConsumerLocation, ApiError>;
}
