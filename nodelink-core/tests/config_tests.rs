//! Unit tests for client configuration
//!
//! Covers TOML parsing with partial files, validation, and the derived
//! store settings.

use std::time::Duration;

use nodelink_core::config::toml_config::load_config_from_path;
use nodelink_core::config::NodelinkConfig;
use nodelink_core::error::{ConfigError, NodelinkError};
use tempfile::tempdir;

#[test]
fn test_empty_file_uses_defaults() {
    let config: NodelinkConfig = toml::from_str("").unwrap();
    assert_eq!(config, NodelinkConfig::default());
    assert_eq!(config.daemon.base_url, "http://127.0.0.1:4050");
    assert_eq!(config.daemon.service_type, "openvpn");
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert!(config.metrics.enabled);
    assert!(config.identity.consumer_id.is_none());
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let toml_str = r#"
        [daemon]
        base_url = "http://localhost:4449"

        [polling]
        status_update_interval_ms = 500

        [identity]
        consumer_id = "0xconsumer"
    "#;

    let config: NodelinkConfig = toml::from_str(toml_str).unwrap();

    assert_eq!(config.daemon.base_url, "http://localhost:4449");
    assert_eq!(config.daemon.request_timeout_ms, 30_000);
    assert_eq!(config.polling.status_update_interval_ms, 500);
    assert_eq!(config.polling.statistics_update_interval_ms, 1_000);
    assert_eq!(config.identity.consumer_id.as_deref(), Some("0xconsumer"));
}

#[test]
fn test_store_settings_follow_config() {
    let toml_str = r#"
        [daemon]
        ip_update_timeout_ms = 2500
        location_update_timeout_ms = 4000

        [polling]
        statistics_update_interval_ms = 3000
    "#;

    let settings = toml::from_str::<NodelinkConfig>(toml_str)
        .unwrap()
        .store_settings();

    assert_eq!(settings.status_update_interval, Duration::from_secs(1));
    assert_eq!(settings.statistics_update_interval, Duration::from_secs(3));
    assert_eq!(settings.ip_update_timeout, Duration::from_millis(2_500));
    assert_eq!(settings.location_update_timeout, Duration::from_secs(4));
}

#[test]
fn test_invalid_base_url_scheme() {
    let mut config = NodelinkConfig::default();
    config.daemon.base_url = "ftp://127.0.0.1:4050".to_string();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidUrl { ref field, .. } if field == "daemon.base_url"));
}

#[test]
fn test_empty_service_type_rejected() {
    let mut config = NodelinkConfig::default();
    config.daemon.service_type = "  ".to_string();

    assert!(config.validate().is_err());
}

#[test]
fn test_zero_batch_size_rejected_when_metrics_enabled() {
    let mut config = NodelinkConfig::default();
    config.metrics.batch_size = 0;
    assert!(config.validate().is_err());

    config.metrics.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_rejects_invalid_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[polling]\nstatus_update_interval_ms = 0\n").unwrap();

    let err = load_config_from_path(&path).unwrap_err();
    assert!(matches!(err, NodelinkError::Config(_)));
}

#[test]
fn test_load_missing_file_fails() {
    let temp_dir = tempdir().unwrap();
    let err = load_config_from_path(temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(
        err,
        NodelinkError::Config(ConfigError::LoadFailed { .. })
    ));
}
