//! Wiring shared by all commands

use std::sync::Arc;

use nodelink_core::api::HttpDaemonApi;
use nodelink_core::bug_reporting::TracingBugReporter;
use nodelink_core::config::toml_config::load_config;
use nodelink_core::config::NodelinkConfig;
use nodelink_core::connection::{ConnectionStore, DaemonConnectionEstablisher};
use nodelink_core::error::NodelinkError;
use nodelink_core::statistics::{
    AggregatingCollector, EventCollector, HttpEventCollector, NoopCollector,
};
use tracing::{debug, warn};

/// Everything a command needs to talk to the daemon
pub struct Context {
    pub config: NodelinkConfig,
    pub api: Arc<HttpDaemonApi>,
    pub store: Arc<ConnectionStore>,
    aggregator: Option<Arc<AggregatingCollector>>,
}

impl Context {
    /// Load and validate the configuration, then build the client stack
    pub fn load() -> Result<Self, NodelinkError> {
        let config = load_config()?;
        config.validate()?;
        debug!(base_url = %config.daemon.base_url, "Loaded configuration");

        let api = Arc::new(HttpDaemonApi::new(
            &config.daemon.base_url,
            config.request_timeout(),
        )?);

        let aggregator = if config.metrics.enabled {
            match HttpEventCollector::new(
                config.metrics.collector_url.clone(),
                config.request_timeout(),
            ) {
                Ok(http) => Some(Arc::new(AggregatingCollector::new(
                    Arc::new(http),
                    config.metrics.batch_size,
                ))),
                Err(e) => {
                    warn!("Analytics disabled, cannot build collector: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let collector: Arc<dyn EventCollector> = match &aggregator {
            Some(aggregator) => Arc::clone(aggregator) as Arc<dyn EventCollector>,
            None => Arc::new(NoopCollector),
        };

        let bug_reporter = Arc::new(TracingBugReporter);
        let establisher = DaemonConnectionEstablisher::new(
            api.clone(),
            collector,
            bug_reporter.clone(),
        )
        .with_service_type(config.daemon.service_type.clone());

        let store = ConnectionStore::new(
            api.clone(),
            Arc::new(establisher),
            bug_reporter,
            config.store_settings(),
        );
        if let Some(consumer_id) = &config.identity.consumer_id {
            store.set_current_identity(consumer_id.clone());
        }

        Ok(Self {
            config,
            api,
            store,
            aggregator,
        })
    }

    /// Stop background loopers and deliver buffered analytics
    pub async fn finish(&self) {
        self.store.shutdown().await;
        if let Some(aggregator) = &self.aggregator {
            if let Err(e) = aggregator.flush().await {
                warn!("Failed to deliver analytics: {}", e);
            }
        }
    }
}
