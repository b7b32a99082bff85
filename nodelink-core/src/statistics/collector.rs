//! Delivery of analytics events
//!
//! One collector instance is built at startup and shared by everything that
//! emits events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CollectorError;

/// Application that produced an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationInfo {
    pub name: String,
    pub version: String,
}

impl ApplicationInfo {
    /// Info describing this build
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Analytics event document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub application: ApplicationInfo,
    /// Creation time in UTC epoch milliseconds
    pub created_at: i64,
    pub event_name: String,
    pub context: serde_json::Value,
}

/// Build an event stamped with the current time
pub fn new_event(event_name: &str, context: serde_json::Value) -> Event {
    Event {
        application: ApplicationInfo::current(),
        created_at: chrono::Utc::now().timestamp_millis(),
        event_name: event_name.to_string(),
        context,
    }
}

/// Sink for analytics events
#[async_trait]
pub trait EventCollector: Send + Sync {
    async fn send_events(&self, events: Vec<Event>) -> Result<(), CollectorError>;
}

/// Posts events as a JSON array to a collector endpoint
#[derive(Debug, Clone)]
pub struct HttpEventCollector {
    client: Client,
    url: String,
}

impl HttpEventCollector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CollectorError> {
        let client = Client::builder().timeout(timeout).use_rustls_tls().build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventCollector for HttpEventCollector {
    #[tracing::instrument(skip(self, events), fields(url = %self.url, count = events.len()))]
    async fn send_events(&self, events: Vec<Event>) -> Result<(), CollectorError> {
        let response = self.client.post(&self.url).json(&events).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(count = events.len(), "Delivered events");
        Ok(())
    }
}

/// Buffers events and forwards them in batches
pub struct AggregatingCollector {
    inner: Arc<dyn EventCollector>,
    batch_size: usize,
    queue: Mutex<Vec<Event>>,
}

impl AggregatingCollector {
    /// `batch_size` of zero is treated as one
    pub fn new(inner: Arc<dyn EventCollector>, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Forward everything buffered so far
    pub async fn flush(&self) -> Result<(), CollectorError> {
        let batch = std::mem::take(&mut *self.queue.lock().await);
        if batch.is_empty() {
            return Ok(());
        }
        self.inner.send_events(batch).await
    }

    /// Number of buffered events
    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }
}

#[async_trait]
impl EventCollector for AggregatingCollector {
    async fn send_events(&self, events: Vec<Event>) -> Result<(), CollectorError> {
        let batch = {
            let mut queue = self.queue.lock().await;
            queue.extend(events);
            if queue.len() < self.batch_size {
                return Ok(());
            }
            std::mem::take(&mut *queue)
        };

        let count = batch.len();
        self.inner.send_events(batch).await.map_err(|e| {
            warn!(count, "Dropping aggregated events: {}", e);
            e
        })
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCollector;

#[async_trait]
impl EventCollector for NoopCollector {
    async fn send_events(&self, _events: Vec<Event>) -> Result<(), CollectorError> {
        Ok(())
    }
}
