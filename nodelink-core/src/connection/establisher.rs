//! Connect and disconnect through the daemon control API

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::messages;
use super::{ConnectionEstablisher, ConnectionStateUpdater, ConnectionStatsFetcher, ErrorMessage};
use crate::api::DaemonApi;
use crate::bug_reporting::{BugReporter, Severity};
use crate::error::TrackerError;
use crate::looper::FunctionLooper;
use crate::statistics::{
    current_user_time, ConnectDetails, ConnectEventTracker, EventCollector, UserTimeProvider,
};
use crate::types::{ConnectionRequest, ConnectionStatus, ConsumerLocation, Provider};

/// Default service requested from providers
pub const DEFAULT_SERVICE_TYPE: &str = "openvpn";

/// Restarts a paused looper when dropped
///
/// Holding one for the whole operation resumes the looper exactly once on
/// every exit path, including early returns and a dropped future.
struct ResumeOnDrop<'a> {
    looper: Option<&'a FunctionLooper>,
}

impl Drop for ResumeOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(looper) = self.looper {
            debug!("Resuming status looper");
            looper.start();
        }
    }
}

/// Stop `looper` and wait for its in-flight cycle
///
/// The guard exists before the wait, so dropping this future part way
/// still resumes the looper.
async fn pause_looper(looper: Option<&FunctionLooper>) -> ResumeOnDrop<'_> {
    let resume = ResumeOnDrop { looper };
    if let Some(looper) = looper {
        debug!("Pausing status looper");
        looper.stop().await;
    }
    resume
}

fn log_out_of_order(result: Result<(), TrackerError>) {
    if let Err(e) = result {
        error!("Connect telemetry used out of order: {}", e);
    }
}

/// Connection establisher backed by the node daemon
pub struct DaemonConnectionEstablisher {
    api: Arc<dyn DaemonApi>,
    collector: Arc<dyn EventCollector>,
    bug_reporter: Arc<dyn BugReporter>,
    user_time: UserTimeProvider,
    service_type: String,
}

impl DaemonConnectionEstablisher {
    pub fn new(
        api: Arc<dyn DaemonApi>,
        collector: Arc<dyn EventCollector>,
        bug_reporter: Arc<dyn BugReporter>,
    ) -> Self {
        Self {
            api,
            collector,
            bug_reporter,
            user_time: Arc::new(current_user_time),
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
        }
    }

    /// Replace the clock used for connect telemetry
    pub fn with_user_time(mut self, user_time: UserTimeProvider) -> Self {
        self.user_time = user_time;
        self
    }

    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = service_type.into();
        self
    }

    fn new_tracker(&self) -> ConnectEventTracker {
        ConnectEventTracker::new(Arc::clone(&self.collector), Arc::clone(&self.user_time))
    }
}

#[async_trait]
impl ConnectionEstablisher for DaemonConnectionEstablisher {
    #[tracing::instrument(
        skip(self, provider, state, error_message, location, looper),
        fields(provider_id = %provider.id)
    )]
    async fn connect(
        &self,
        consumer_id: &str,
        provider: &Provider,
        state: &dyn ConnectionStateUpdater,
        error_message: &dyn ErrorMessage,
        location: Option<&ConsumerLocation>,
        looper: Option<&FunctionLooper>,
    ) {
        let _resume = pause_looper(looper).await;

        let mut tracker = self.new_tracker();
        tracker.connect_started(ConnectDetails {
            consumer_id: consumer_id.to_string(),
            provider_id: provider.id.clone(),
            consumer_country: location
                .and_then(|location| location.country.clone())
                .unwrap_or_default(),
            provider_country: provider.country.clone().unwrap_or_default(),
        });

        state
            .set_connection_status(ConnectionStatus::Connecting)
            .await;
        state.reset_statistics();
        state.set_last_connection_provider(provider.clone());

        let request = ConnectionRequest {
            consumer_id: consumer_id.to_string(),
            provider_id: provider.id.clone(),
            service_type: self.service_type.clone(),
        };

        match self.api.connection_create(&request).await {
            Ok(response) => {
                info!(status = %response.status, "Connection request accepted");
                log_out_of_order(tracker.connect_ended(None).await);
                error_message.hide();
            }
            Err(err) if err.is_request_closed() => {
                info!("Connection request was superseded");
                log_out_of_order(tracker.connect_canceled().await);
            }
            Err(err) => {
                warn!("Connection to provider failed: {}", err);
                log_out_of_order(
                    tracker
                        .connect_ended(Some(messages::CONNECT_FAILED_EVENT_ERROR))
                        .await,
                );
                error_message.show(messages::CONNECT_FAILED);
                if !err.is_expected() {
                    self.bug_reporter.capture_exception(Severity::Info, &err);
                }
            }
        }
    }

    #[tracing::instrument(skip_all)]
    async fn disconnect(
        &self,
        state: &dyn ConnectionStateUpdater,
        stats_fetcher: &dyn ConnectionStatsFetcher,
        error_message: &dyn ErrorMessage,
        looper: Option<&FunctionLooper>,
    ) {
        let _resume = pause_looper(looper).await;

        state
            .set_connection_status(ConnectionStatus::Disconnecting)
            .await;

        match self.api.connection_cancel().await {
            Ok(()) => {
                info!("Connection cancelled");
                error_message.hide();
            }
            Err(err) => {
                error_message.show(messages::DISCONNECT_FAILED);
                info!("Connection cancelling failed: {}", err);
                if !err.is_expected() {
                    self.bug_reporter.capture_exception(Severity::Info, &err);
                }
            }
        }

        stats_fetcher.fetch_connection_status().await;
        stats_fetcher.fetch_connection_ip().await;
    }
}
