//! Configuration module
//!
//! Handles loading and saving client configuration from TOML files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::connection::StoreSettings;
use crate::error::ConfigError;

pub mod toml_config;

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodelinkConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Where and how to reach the node daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Base URL of the daemon control API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Service requested from providers
    #[serde(default = "default_service_type")]
    pub service_type: String,

    /// Timeout for control requests in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_ip_update_timeout")]
    pub ip_update_timeout_ms: u64,

    #[serde(default = "default_location_update_timeout")]
    pub location_update_timeout_ms: u64,
}

/// Intervals of background refreshes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_status_update_interval")]
    pub status_update_interval_ms: u64,

    #[serde(default = "default_statistics_update_interval")]
    pub statistics_update_interval_ms: u64,
}

/// Connection analytics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    #[serde(default = "default_collector_url")]
    pub collector_url: String,

    /// Events buffered before they are sent
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Consumer identity used for connections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub consumer_id: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:4050".to_string()
}
fn default_service_type() -> String {
    crate::connection::establisher::DEFAULT_SERVICE_TYPE.to_string()
}
fn default_request_timeout() -> u64 {
    30_000
}
fn default_ip_update_timeout() -> u64 {
    10_000
}
fn default_location_update_timeout() -> u64 {
    10_000
}
fn default_status_update_interval() -> u64 {
    1_000
}
fn default_statistics_update_interval() -> u64 {
    1_000
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_collector_url() -> String {
    "http://metrics.mysterium.network:8091".to_string()
}
fn default_batch_size() -> usize {
    10
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            service_type: default_service_type(),
            request_timeout_ms: default_request_timeout(),
            ip_update_timeout_ms: default_ip_update_timeout(),
            location_update_timeout_ms: default_location_update_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_update_interval_ms: default_status_update_interval(),
            statistics_update_interval_ms: default_statistics_update_interval(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            collector_url: default_collector_url(),
            batch_size: default_batch_size(),
        }
    }
}

impl NodelinkConfig {
    /// Validate the configuration
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("daemon.base_url", &self.daemon.base_url)?;

        if self.daemon.service_type.trim().is_empty() {
            return Err(validation("daemon.service_type cannot be empty"));
        }

        let durations = [
            ("daemon.request_timeout_ms", self.daemon.request_timeout_ms),
            ("daemon.ip_update_timeout_ms", self.daemon.ip_update_timeout_ms),
            (
                "daemon.location_update_timeout_ms",
                self.daemon.location_update_timeout_ms,
            ),
            (
                "polling.status_update_interval_ms",
                self.polling.status_update_interval_ms,
            ),
            (
                "polling.statistics_update_interval_ms",
                self.polling.statistics_update_interval_ms,
            ),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(validation(&format!("{} cannot be zero", field)));
            }
        }

        if self.metrics.enabled {
            validate_http_url("metrics.collector_url", &self.metrics.collector_url)?;
            if self.metrics.batch_size == 0 {
                return Err(validation("metrics.batch_size cannot be zero"));
            }
        }

        if let Some(consumer_id) = &self.identity.consumer_id {
            if consumer_id.trim().is_empty() {
                return Err(validation("identity.consumer_id cannot be empty"));
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.daemon.request_timeout_ms)
    }

    /// Looper intervals and refresh timeouts for the connection store
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            status_update_interval: Duration::from_millis(self.polling.status_update_interval_ms),
            statistics_update_interval: Duration::from_millis(
                self.polling.statistics_update_interval_ms,
            ),
            ip_update_timeout: Duration::from_millis(self.daemon.ip_update_timeout_ms),
            location_update_timeout: Duration::from_millis(self.daemon.location_update_timeout_ms),
        }
    }
}

fn validation(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ConfigError::InvalidUrl {
                field: field.to_string(),
                reason: format!("URL scheme must be http or https, got: {}", scheme),
            }),
        },
        Err(e) => Err(ConfigError::InvalidUrl {
            field: field.to_string(),
            reason: format!("Failed to parse URL: {}", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(NodelinkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = NodelinkConfig::default();
        config.polling.status_update_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("polling.status_update_interval_ms"));
    }

    #[test]
    fn test_collector_url_ignored_when_metrics_disabled() {
        let mut config = NodelinkConfig::default();
        config.metrics.enabled = false;
        config.metrics.collector_url = "not a url".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_settings_conversion() {
        let mut config = NodelinkConfig::default();
        config.polling.statistics_update_interval_ms = 2_500;
        let settings = config.store_settings();
        assert_eq!(settings.statistics_update_interval, Duration::from_millis(2_500));
        assert_eq!(settings.status_update_interval, Duration::from_secs(1));
    }
}
