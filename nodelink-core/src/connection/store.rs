//! Connection state store
//!
//! Owns everything the UI shows about the connection, including the named
//! background loopers that keep it fresh. Lifecycle operations are delegated
//! to a [`ConnectionEstablisher`] that mutates the store through the
//! capability traits it implements.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::messages;
use super::{ConnectionEstablisher, ConnectionStateUpdater, ConnectionStatsFetcher, ErrorMessage};
use crate::api::DaemonApi;
use crate::bug_reporting::{BugReporter, Severity};
use crate::error::{ApiError, ConnectionError};
use crate::looper::{ActionLooper, ActionLooperConfig, FunctionLooper, LooperRegistry};
use crate::types::{ConnectionStatistics, ConnectionStatus, ConsumerLocation, Provider};

/// Names of the actions a looper can dispatch
pub mod actions {
    pub const FETCH_CONNECTION_STATUS: &str = "fetch-connection-status";
    pub const CONNECTION_STATISTICS: &str = "connection-statistics";
    pub const CONNECTION_IP: &str = "connection-ip";
    pub const LOCATION: &str = "location";

    pub const ALL: [&str; 4] = [
        FETCH_CONNECTION_STATUS,
        CONNECTION_STATISTICS,
        CONNECTION_IP,
        LOCATION,
    ];
}

/// Timing of background refreshes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub status_update_interval: Duration,
    pub statistics_update_interval: Duration,
    pub ip_update_timeout: Duration,
    pub location_update_timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            status_update_interval: Duration::from_secs(1),
            statistics_update_interval: Duration::from_secs(1),
            ip_update_timeout: Duration::from_secs(10),
            location_update_timeout: Duration::from_secs(10),
        }
    }
}

/// Status transition broadcast to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub old: ConnectionStatus,
    pub new: ConnectionStatus,
}

/// Read-only copy of the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub status: ConnectionStatus,
    pub ip: Option<String>,
    pub location: Option<ConsumerLocation>,
    pub last_connection_provider: Option<Provider>,
    pub statistics: ConnectionStatistics,
    pub error_message: Option<String>,
    /// Actions that currently have a looper
    pub action_loopers: Vec<String>,
}

#[derive(Debug, Default)]
struct ConnectionData {
    status: ConnectionStatus,
    ip: Option<String>,
    location: Option<ConsumerLocation>,
    last_connection_provider: Option<Provider>,
    statistics: ConnectionStatistics,
    error_message: Option<String>,
    consumer_id: Option<String>,
}

/// Single writer of connection state
pub struct ConnectionStore {
    api: Arc<dyn DaemonApi>,
    establisher: Arc<dyn ConnectionEstablisher>,
    bug_reporter: Arc<dyn BugReporter>,
    settings: StoreSettings,
    data: Mutex<ConnectionData>,
    loopers: LooperRegistry,
    status_tx: watch::Sender<StatusChange>,
    self_ref: Weak<ConnectionStore>,
}

impl ConnectionStore {
    pub fn new(
        api: Arc<dyn DaemonApi>,
        establisher: Arc<dyn ConnectionEstablisher>,
        bug_reporter: Arc<dyn BugReporter>,
        settings: StoreSettings,
    ) -> Arc<Self> {
        let initial = StatusChange {
            old: ConnectionStatus::NotConnected,
            new: ConnectionStatus::NotConnected,
        };
        let (status_tx, _status_rx) = watch::channel(initial);

        Arc::new_cyclic(|self_ref| Self {
            api,
            establisher,
            bug_reporter,
            settings,
            data: Mutex::new(ConnectionData::default()),
            loopers: LooperRegistry::new(),
            status_tx,
            self_ref: self_ref.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionData> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let data = self.lock();
        ConnectionSnapshot {
            status: data.status,
            ip: data.ip.clone(),
            location: data.location.clone(),
            last_connection_provider: data.last_connection_provider.clone(),
            statistics: data.statistics.clone(),
            error_message: data.error_message.clone(),
            action_loopers: self.loopers.actions(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn ip(&self) -> Option<String> {
        self.lock().ip.clone()
    }

    pub fn location(&self) -> Option<ConsumerLocation> {
        self.lock().location.clone()
    }

    pub fn statistics(&self) -> ConnectionStatistics {
        self.lock().statistics.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.lock().error_message.clone()
    }

    /// Provider of the most recent connection attempt
    pub fn last_connection_attempt_provider(&self) -> Option<Provider> {
        self.lock().last_connection_provider.clone()
    }

    /// Identity used as consumer for connections
    pub fn set_current_identity(&self, consumer_id: impl Into<String>) {
        self.lock().consumer_id = Some(consumer_id.into());
    }

    pub fn current_identity(&self) -> Option<String> {
        self.lock().consumer_id.clone()
    }

    /// Receive every status transition
    pub fn subscribe(&self) -> watch::Receiver<StatusChange> {
        self.status_tx.subscribe()
    }

    /// Looper currently registered for `action`
    pub fn action_looper(&self, action: &str) -> Option<FunctionLooper> {
        self.loopers.get(action)
    }

    /// Register a looper, replacing the one stored under the same action
    pub fn set_action_looper(&self, entry: ActionLooper) {
        if let Some(previous) = self.loopers.insert(entry) {
            debug!(running = previous.is_running(), "Replaced action looper");
        }
    }

    /// Run the named action once
    pub async fn dispatch(&self, action: &str) -> Result<(), ConnectionError> {
        match action {
            actions::FETCH_CONNECTION_STATUS => {
                ConnectionStatsFetcher::fetch_connection_status(self).await
            }
            actions::CONNECTION_STATISTICS => self.fetch_connection_statistics().await,
            actions::CONNECTION_IP => ConnectionStatsFetcher::fetch_connection_ip(self).await,
            actions::LOCATION => self.fetch_location().await,
            unknown => {
                return Err(ConnectionError::UnknownAction {
                    action: unknown.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Loop `config.action` unless it is looping already
    ///
    /// Returns the handle of the looper that owns the action.
    pub fn start_action_looping(
        &self,
        config: ActionLooperConfig,
    ) -> Result<FunctionLooper, ConnectionError> {
        if !actions::ALL.contains(&config.action.as_str()) {
            return Err(ConnectionError::UnknownAction {
                action: config.action,
            });
        }

        let looper = self.loopers.start_if_absent(&config, || {
            let store = self.self_ref.clone();
            let action = config.action.clone();
            let looper = FunctionLooper::new(
                move || {
                    let store = store.clone();
                    let action = action.clone();
                    async move {
                        let store = store
                            .upgrade()
                            .ok_or_else(|| anyhow::anyhow!("connection store was dropped"))?;
                        store.dispatch(&action).await?;
                        Ok(())
                    }
                },
                config.interval,
            );

            let action = config.action.clone();
            let bug_reporter = Arc::clone(&self.bug_reporter);
            looper.on_function_error(move |err| {
                error!(action = %action, "Error while executing action: {:#}", err);
                bug_reporter.capture_exception(Severity::Error, &**err);
            });
            looper
        });
        Ok(looper)
    }

    /// Stop the looper of `action` and forget it
    pub async fn stop_action_looping(&self, action: &str) {
        self.loopers.stop(action).await;
    }

    /// Stop every background looper
    pub async fn shutdown(&self) {
        self.loopers.stop_all().await;
    }

    /// Refresh the original location of the consumer
    pub async fn fetch_location(&self) {
        match self
            .api
            .location(Some(self.settings.location_update_timeout))
            .await
        {
            Ok(location) => self.lock().location = Some(location),
            Err(err) => self.report_refresh_failure("location", &err),
        }
    }

    /// Refresh traffic counters
    pub async fn fetch_connection_statistics(&self) {
        match self.api.connection_statistics().await {
            Ok(statistics) => self.lock().statistics = statistics,
            Err(err) => {
                warn!("Failed to fetch connection statistics: {}", err);
                self.show(messages::CONNECTION_STATISTICS_FAILED);
            }
        }
    }

    /// Connect to `provider` with the current identity
    pub async fn connect(&self, provider: Provider) -> Result<(), ConnectionError> {
        let (consumer_id, location) = {
            let data = self.lock();
            let consumer_id = data.consumer_id.clone().ok_or(ConnectionError::NoIdentity)?;
            (consumer_id, data.location.clone())
        };
        let looper = self.loopers.get(actions::FETCH_CONNECTION_STATUS);

        self.establisher
            .connect(
                &consumer_id,
                &provider,
                self,
                self,
                location.as_ref(),
                looper.as_ref(),
            )
            .await;
        Ok(())
    }

    /// Connect again to the provider of the last attempt
    pub async fn reconnect(&self) -> Result<(), ConnectionError> {
        let provider = self
            .last_connection_attempt_provider()
            .ok_or(ConnectionError::NoPriorProvider)?;
        info!(provider_id = %provider.id, "Reconnecting to last provider");
        self.connect(provider).await
    }

    /// Disconnect the current session
    pub async fn disconnect(&self) {
        let looper = self.loopers.get(actions::FETCH_CONNECTION_STATUS);
        self.establisher
            .disconnect(self, self, self, looper.as_ref())
            .await;
    }

    fn report_refresh_failure(&self, what: &str, err: &ApiError) {
        if err.is_expected() {
            debug!("Daemon could not provide {}: {}", what, err);
            return;
        }
        self.bug_reporter.capture_exception(Severity::Error, err);
    }
}

#[async_trait]
impl ConnectionStateUpdater for ConnectionStore {
    async fn set_connection_status(&self, status: ConnectionStatus) {
        let old = {
            let mut data = self.lock();
            let old = data.status;
            if old == status {
                return;
            }
            data.status = status;
            if matches!(status, ConnectionStatus::Connected | ConnectionStatus::NotConnected) {
                data.ip = None;
            }
            old
        };

        info!(old = %old, new = %status, "Connection status changed");
        self.status_tx
            .send_replace(StatusChange { old, new: status });

        if status == ConnectionStatus::Connected {
            let config = ActionLooperConfig::new(
                actions::CONNECTION_STATISTICS,
                self.settings.statistics_update_interval,
            );
            if let Err(e) = self.start_action_looping(config) {
                error!("Failed to start statistics looper: {}", e);
            }
        }
        if old == ConnectionStatus::Connected {
            self.stop_action_looping(actions::CONNECTION_STATISTICS)
                .await;
        }
    }

    fn reset_statistics(&self) {
        self.lock().statistics = ConnectionStatistics::default();
    }

    fn set_last_connection_provider(&self, provider: Provider) {
        self.lock().last_connection_provider = Some(provider);
    }
}

impl ErrorMessage for ConnectionStore {
    fn show(&self, message: &str) {
        self.lock().error_message = Some(message.to_string());
    }

    fn hide(&self) {
        self.lock().error_message = None;
    }
}

#[async_trait]
impl ConnectionStatsFetcher for ConnectionStore {
    async fn fetch_connection_status(&self) {
        match self.api.connection_status().await {
            Ok(response) => self.set_connection_status(response.status).await,
            Err(err) => {
                warn!("Failed to fetch connection status: {}", err);
                self.show(messages::CONNECTION_STATUS_FAILED);
            }
        }
    }

    async fn fetch_connection_ip(&self) {
        match self
            .api
            .connection_ip(Some(self.settings.ip_update_timeout))
            .await
        {
            Ok(ip) => self.lock().ip = Some(ip.ip),
            Err(err) => self.report_refresh_failure("IP", &err),
        }
    }
}
