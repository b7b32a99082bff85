//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodelink_core::api::DaemonApi;
use nodelink_core::bug_reporting::{BugReporter, Severity};
use nodelink_core::connection::{ConnectionStateUpdater, ConnectionStatsFetcher, ErrorMessage};
use nodelink_core::error::{ApiError, CollectorError};
use nodelink_core::looper::FunctionLooper;
use nodelink_core::statistics::{Event, EventCollector, UserTime, UserTimeProvider};
use nodelink_core::types::{
    ConnectionIp, ConnectionRequest, ConnectionStatistics, ConnectionStatus,
    ConnectionStatusResponse, ConsumerLocation, Provider,
};

/// Scriptable daemon API that records every call
#[derive(Default)]
pub struct MockDaemonApi {
    pub calls: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<ConnectionRequest>>,
    pub create_error: Mutex<Option<ApiError>>,
    pub cancel_error: Mutex<Option<ApiError>>,
    pub status: Mutex<Option<ConnectionStatus>>,
    pub status_error: Mutex<Option<ApiError>>,
    pub statistics: Mutex<ConnectionStatistics>,
    pub statistics_error: Mutex<Option<ApiError>>,
    pub ip: Mutex<Option<String>>,
    pub ip_error: Mutex<Option<ApiError>>,
    pub location: Mutex<ConsumerLocation>,
    pub location_error: Mutex<Option<ApiError>>,
    /// Looper whose running state is sampled on connect/cancel
    pub observed_looper: Mutex<Option<FunctionLooper>>,
    pub looper_running_during_call: Mutex<Vec<bool>>,
}

impl MockDaemonApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
        if let Some(looper) = self.observed_looper.lock().unwrap().as_ref() {
            self.looper_running_during_call
                .lock()
                .unwrap()
                .push(looper.is_running());
        }
    }

    fn failure(slot: &Mutex<Option<ApiError>>) -> Result<(), ApiError> {
        match slot.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DaemonApi for MockDaemonApi {
    async fn connection_create(
        &self,
        request: &ConnectionRequest,
    ) -> Result<ConnectionStatusResponse, ApiError> {
        self.record("connection_create");
        self.requests.lock().unwrap().push(request.clone());
        Self::failure(&self.create_error)?;
        Ok(ConnectionStatusResponse {
            status: ConnectionStatus::Connecting,
            session_id: Some("session-1".to_string()),
        })
    }

    async fn connection_cancel(&self) -> Result<(), ApiError> {
        self.record("connection_cancel");
        Self::failure(&self.cancel_error)
    }

    async fn connection_status(&self) -> Result<ConnectionStatusResponse, ApiError> {
        self.record("connection_status");
        Self::failure(&self.status_error)?;
        Ok(ConnectionStatusResponse {
            status: self
                .status
                .lock()
                .unwrap()
                .unwrap_or(ConnectionStatus::NotConnected),
            session_id: None,
        })
    }

    async fn connection_statistics(&self) -> Result<ConnectionStatistics, ApiError> {
        self.record("connection_statistics");
        Self::failure(&self.statistics_error)?;
        Ok(self.statistics.lock().unwrap().clone())
    }

    async fn connection_ip(&self, _timeout: Option<Duration>) -> Result<ConnectionIp, ApiError> {
        self.record("connection_ip");
        Self::failure(&self.ip_error)?;
        Ok(ConnectionIp {
            ip: self
                .ip
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "10.0.0.1".to_string()),
        })
    }

    async fn location(&self, _timeout: Option<Duration>) -> Result<ConsumerLocation, ApiError> {
        self.record("location");
        Self::failure(&self.location_error)?;
        Ok(self.location.lock().unwrap().clone())
    }
}

/// Collector that keeps every event
#[derive(Default)]
pub struct RecordingCollector {
    pub events: Mutex<Vec<Event>>,
    pub fail: Mutex<bool>,
}

impl RecordingCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event_name).collect()
    }
}

#[async_trait]
impl EventCollector for RecordingCollector {
    async fn send_events(&self, events: Vec<Event>) -> Result<(), CollectorError> {
        self.events.lock().unwrap().extend(events);
        if *self.fail.lock().unwrap() {
            return Err(CollectorError::Rejected { status: 503 });
        }
        Ok(())
    }
}

/// Bug reporter that keeps the rendered errors
#[derive(Default)]
pub struct RecordingBugReporter {
    pub captured: Mutex<Vec<(Severity, String)>>,
}

impl RecordingBugReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn captured(&self) -> Vec<(Severity, String)> {
        self.captured.lock().unwrap().clone()
    }
}

impl BugReporter for RecordingBugReporter {
    fn capture_exception(&self, severity: Severity, error: &(dyn std::error::Error + 'static)) {
        self.captured
            .lock()
            .unwrap()
            .push((severity, error.to_string()));
    }
}

/// Records every mutation the establisher performs
#[derive(Default)]
pub struct RecordingState {
    pub statuses: Mutex<Vec<ConnectionStatus>>,
    pub statistics_resets: Mutex<usize>,
    pub last_provider: Mutex<Option<Provider>>,
    pub shown: Mutex<Vec<String>>,
    pub hidden: Mutex<usize>,
    pub status_fetches: Mutex<usize>,
    pub ip_fetches: Mutex<usize>,
}

impl RecordingState {
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }

    pub fn hidden(&self) -> usize {
        *self.hidden.lock().unwrap()
    }
}

#[async_trait]
impl ConnectionStateUpdater for RecordingState {
    async fn set_connection_status(&self, status: ConnectionStatus) {
        self.statuses.lock().unwrap().push(status);
    }

    fn reset_statistics(&self) {
        *self.statistics_resets.lock().unwrap() += 1;
    }

    fn set_last_connection_provider(&self, provider: Provider) {
        *self.last_provider.lock().unwrap() = Some(provider);
    }
}

impl ErrorMessage for RecordingState {
    fn show(&self, message: &str) {
        self.shown.lock().unwrap().push(message.to_string());
    }

    fn hide(&self) {
        *self.hidden.lock().unwrap() += 1;
    }
}

#[async_trait]
impl ConnectionStatsFetcher for RecordingState {
    async fn fetch_connection_status(&self) {
        *self.status_fetches.lock().unwrap() += 1;
    }

    async fn fetch_connection_ip(&self) {
        *self.ip_fetches.lock().unwrap() += 1;
    }
}

/// Clock that advances by `step_ms` on every reading
pub fn stepping_clock(start_ms: i64, step_ms: i64) -> UserTimeProvider {
    let next = Arc::new(AtomicI64::new(start_ms));
    Arc::new(move || {
        let utc_time = next.fetch_add(step_ms, Ordering::SeqCst);
        UserTime {
            local_time: utc_time + 3_600_000,
            utc_time,
        }
    })
}

pub fn provider(id: &str, country: Option<&str>) -> Provider {
    Provider::new(id, country.map(str::to_string))
}
