//! Connection lifecycle
//!
//! The establisher sequences connect and disconnect against the daemon. It
//! reaches the rest of the application only through the small capability
//! traits defined here, which the [`ConnectionStore`] implements.

pub mod establisher;
pub mod messages;
pub mod store;

use async_trait::async_trait;

use crate::looper::FunctionLooper;
use crate::types::{ConnectionStatus, ConsumerLocation, Provider};

pub use establisher::DaemonConnectionEstablisher;
pub use store::{ConnectionSnapshot, ConnectionStore, StatusChange, StoreSettings};

/// Mutation points into connection state
#[async_trait]
pub trait ConnectionStateUpdater: Send + Sync {
    async fn set_connection_status(&self, status: ConnectionStatus);
    fn reset_statistics(&self);
    fn set_last_connection_provider(&self, provider: Provider);
}

/// User-facing error banner
pub trait ErrorMessage: Send + Sync {
    fn show(&self, message: &str);
    fn hide(&self);
}

/// Best-effort refreshes of connection data
#[async_trait]
pub trait ConnectionStatsFetcher: Send + Sync {
    async fn fetch_connection_status(&self);
    async fn fetch_connection_ip(&self);
}

/// Connects to and disconnects from providers
///
/// Callers run at most one lifecycle operation at a time; implementations do
/// not serialize concurrent calls themselves.
#[async_trait]
pub trait ConnectionEstablisher: Send + Sync {
    /// Connect `consumer_id` to `provider`
    ///
    /// `looper` is paused for the duration of the attempt and resumed on
    /// every exit path.
    async fn connect(
        &self,
        consumer_id: &str,
        provider: &Provider,
        state: &dyn ConnectionStateUpdater,
        error_message: &dyn ErrorMessage,
        location: Option<&ConsumerLocation>,
        looper: Option<&FunctionLooper>,
    );

    /// Disconnect the current session
    async fn disconnect(
        &self,
        state: &dyn ConnectionStateUpdater,
        stats_fetcher: &dyn ConnectionStatsFetcher,
        error_message: &dyn ErrorMessage,
        looper: Option<&FunctionLooper>,
    );
}
