//! Application configuration: loading, validation, and hot-reload.

mod app_config;
mod database;
mod manager;
mod watcher;

pub use app_config::{
    AppConfig, AuthConfig, GlobalConfig, HealthCheckConfig, KeyHealthCheckConfig,
    LogCleanupConfig, QueueFullStrategy, RedisConfig, RequestLogQueueConfig,
    RequestLoggingConfig, ServerConfig,
};
pub use database::DatabaseConfig;
pub use manager::ConfigManager;
pub use watcher::{ConfigEvent, ConfigWatcher};

use std::env;
use std::path::Path;

/// Loads `config/config.{RUST_ENV}.toml` directly, without going through
/// [`ConfigManager`]. Used by callers that only need a one-shot load.
pub fn load_config() -> crate::error::Result<AppConfig> {
    let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config_file = format!("config/config.{env_name}.toml");

    if !Path::new(&config_file).exists() {
        return Err(crate::error::ProxyError::config(format!(
            "config file does not exist: {config_file}"
        )));
    }

    let config_content = std::fs::read_to_string(&config_file).map_err(|e| {
        crate::error::ProxyError::config_with_source(
            format!("failed to read config file: {config_file}"),
            e,
        )
    })?;

    let config: AppConfig = toml::from_str(&config_content)?;
    validate_config(&config)?;

    Ok(config)
}

/// Validates cross-field invariants the TOML schema itself cannot express.
fn validate_config(config: &AppConfig) -> crate::error::Result<()> {
    if config.server.port == 0 {
        return Err(crate::error::ProxyError::config(format!(
            "invalid server port: {}",
            config.server.port
        )));
    }

    if config.server.workers == 0 {
        return Err(crate::error::ProxyError::config(
            "server.workers must be greater than 0",
        ));
    }

    if config.database.url.is_empty() {
        return Err(crate::error::ProxyError::config(
            "database.url must not be empty",
        ));
    }

    if config.database.max_connections == 0 {
        return Err(crate::error::ProxyError::config(
            "database.max_connections must be greater than 0",
        ));
    }

    if config.redis.enabled && config.redis.url.is_empty() {
        return Err(crate::error::ProxyError::config(
            "redis.url must not be empty when redis.enabled is true",
        ));
    }

    if config.request_logging.queue.max_capacity == 0 {
        return Err(crate::error::ProxyError::config(
            "request_logging.queue.max_capacity must be greater than 0",
        ));
    }

    if config.request_logging.queue.batch_size == 0 {
        return Err(crate::error::ProxyError::config(
            "request_logging.queue.batch_size must be greater than 0",
        ));
    }

    Ok(())
}
