//! TOML configuration file I/O
//!
//! Handles loading client configuration from TOML files
//! in the user's configuration directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::NodelinkConfig;
use crate::error::{ConfigError, NodelinkError};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/nodelink, or NODELINK_CONFIG_DIR environment variable if set
pub fn get_config_dir() -> Result<PathBuf, NodelinkError> {
    if let Ok(config_dir) = std::env::var("NODELINK_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = std::env::var("HOME").map_err(|_| {
        NodelinkError::Config(ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })
    })?;

    Ok(PathBuf::from(home).join(".config").join("nodelink"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, NodelinkError> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default TOML file
///
/// A missing file yields the built-in defaults.
pub fn load_config() -> Result<NodelinkConfig, NodelinkError> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        debug!("No configuration at {:?}, using defaults", config_path);
        return Ok(NodelinkConfig::default());
    }
    load_config_from_path(&config_path)
}

/// Load configuration from a specific TOML file
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<NodelinkConfig, NodelinkError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => NodelinkError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => NodelinkError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: NodelinkConfig = toml::from_str(&contents).map_err(|e| {
        NodelinkError::Config(ConfigError::IoError {
            message: format!("Failed to parse TOML: {}", e),
        })
    })?;

    config.validate()?;

    info!(
        "Loaded configuration: daemon={}, status_interval={}ms, statistics_interval={}ms, metrics={}",
        config.daemon.base_url,
        config.polling.status_update_interval_ms,
        config.polling.statistics_update_interval_ms,
        config.metrics.enabled
    );

    Ok(config)
}
