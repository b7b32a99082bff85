//! Timing events around a single connection attempt
//!
//! [`ConnectEventTracker`] brackets an attempt: `connect_started` opens the
//! context, `connect_ended` or `connect_canceled` closes it and emits exactly
//! one event to the collector.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::collector::{new_event, EventCollector};
use crate::error::TrackerError;

pub const CONNECT_SUCCESSFUL: &str = "connect_successful";
pub const CONNECT_FAILED: &str = "connect_failed";
pub const CONNECT_CANCELED: &str = "connect_canceled";

/// Wall-clock reading in epoch milliseconds, both local and UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTime {
    pub local_time: i64,
    pub utc_time: i64,
}

/// Injectable clock for the tracker
pub type UserTimeProvider = Arc<dyn Fn() -> UserTime + Send + Sync>;

/// Read the system clock
pub fn current_user_time() -> UserTime {
    let now = chrono::Local::now();
    let utc_time = now.timestamp_millis();
    let offset_millis = i64::from(now.offset().local_minus_utc()) * 1000;
    UserTime {
        local_time: utc_time + offset_millis,
        utc_time,
    }
}

/// Who connected where
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectDetails {
    pub consumer_id: String,
    pub provider_id: String,
    /// Country the consumer connects from, empty when unknown
    pub consumer_country: String,
    /// Country of the provider, empty when unknown
    pub provider_country: String,
}

/// Context attached to the emitted event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectContext {
    pub started_at: UserTime,
    pub connection_details: ConnectDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<UserTime>,
    /// Elapsed UTC milliseconds between start and end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tracks one connection attempt at a time
///
/// Starting again before the previous attempt was closed replaces its
/// context; that attempt then never emits.
pub struct ConnectEventTracker {
    collector: Arc<dyn EventCollector>,
    user_time: UserTimeProvider,
    context: Option<ConnectContext>,
}

impl ConnectEventTracker {
    pub fn new(collector: Arc<dyn EventCollector>, user_time: UserTimeProvider) -> Self {
        Self {
            collector,
            user_time,
            context: None,
        }
    }

    /// Whether an attempt is open
    pub fn is_started(&self) -> bool {
        self.context.is_some()
    }

    /// Open a new attempt
    pub fn connect_started(&mut self, details: ConnectDetails) {
        if let Some(previous) = &self.context {
            warn!(
                provider_id = %previous.connection_details.provider_id,
                "Superseding connection attempt that was never finalized"
            );
        }
        self.context = Some(ConnectContext {
            started_at: (self.user_time)(),
            connection_details: details,
            ended_at: None,
            time_delta: None,
            error: None,
        });
    }

    /// Close the attempt as successful, or as failed when `error` is given
    pub async fn connect_ended(&mut self, error: Option<&str>) -> Result<(), TrackerError> {
        let mut context = self.finish()?;
        let event_name = match error {
            Some(message) => {
                context.error = Some(message.to_string());
                CONNECT_FAILED
            }
            None => CONNECT_SUCCESSFUL,
        };
        self.emit(event_name, context).await;
        Ok(())
    }

    /// Close the attempt as canceled
    pub async fn connect_canceled(&mut self) -> Result<(), TrackerError> {
        let context = self.finish()?;
        self.emit(CONNECT_CANCELED, context).await;
        Ok(())
    }

    fn finish(&mut self) -> Result<ConnectContext, TrackerError> {
        let mut context = self.context.take().ok_or(TrackerError::ConnectNotStarted)?;
        let ended_at = (self.user_time)();
        context.time_delta = Some(ended_at.utc_time - context.started_at.utc_time);
        context.ended_at = Some(ended_at);
        Ok(context)
    }

    async fn emit(&self, event_name: &str, context: ConnectContext) {
        let payload = match serde_json::to_value(&context) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(event = event_name, "Failed to serialize connect context: {}", e);
                return;
            }
        };

        match self
            .collector
            .send_events(vec![new_event(event_name, payload)])
            .await
        {
            Ok(()) => debug!(event = event_name, time_delta = ?context.time_delta, "Connect event sent"),
            Err(e) => warn!(event = event_name, "Failed to send connect event: {}", e),
        }
    }
}
