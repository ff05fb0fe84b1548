//! Application configuration structure, loaded from `config/config.{RUST_ENV}.toml`.

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: super::DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub global: GlobalConfig,
    pub log_cleanup: LogCleanupConfig,
    pub health_check: HealthCheckConfig,
    pub key_health_check: KeyHealthCheckConfig,
    pub request_logging: RequestLoggingConfig,
    pub auth: AuthConfig,
}

/// HTTP listener configuration for the dispatcher and the admin liveness route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub admin_port: u16,
    pub workers: usize,
}

/// Optional Redis-backed group snapshot cache, layered in front of the
/// in-process moka cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub connection_timeout_seconds: u64,
    pub default_ttl_seconds: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379/0".to_string(),
            connection_timeout_seconds: 10,
            default_ttl_seconds: 3600,
        }
    }
}

/// Global cross-cutting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Overall connect timeout applied to outbound HTTP calls, in seconds.
    pub connection_timeout: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            connection_timeout: 30,
        }
    }
}

/// `log_cleanup.*` — periodic pruning of old request log rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogCleanupConfig {
    pub enabled: bool,
    pub interval_hours: u64,
    pub cleanup_on_startup: bool,
    pub retention_days: u32,
}

/// `health_check.*` — upstream/provider health probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    pub check_on_startup: bool,
    pub enable_cleanup: bool,
    pub retention_days: u32,
    pub max_concurrent_groups: usize,
    pub check_timeout_seconds: u64,
}

/// `key_health_check.*` — per-key recovery probing cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyHealthCheckConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
}

/// `request_logging.*` — async log pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLoggingConfig {
    pub enabled: bool,
    pub queue: RequestLogQueueConfig,
    pub truncate_body_to: usize,
    pub retention_days: u32,
}

/// `request_logging.queue.*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogQueueConfig {
    pub enabled: bool,
    pub max_capacity: usize,
    pub batch_size: usize,
    pub processing_interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub graceful_shutdown_timeout_ms: u64,
    pub full_strategy: QueueFullStrategy,
}

/// Back-pressure policy applied when the log pipeline's queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFullStrategy {
    DropOldest,
    RejectNew,
    Block,
}

/// `auth.*` — proxy key/session secrets, the `jwt_secret` is always
/// overridden from the environment rather than committed to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    pub session_timeout_seconds: u64,
}

impl AuthConfig {
    /// Overrides `jwt_secret` from `PROXY_JWT_SECRET`, keeping the secret out
    /// of the TOML file and out of logs.
    pub fn load_secret_from_env(&mut self) -> crate::error::Result<()> {
        if let Ok(secret) = std::env::var("PROXY_JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if self.jwt_secret.is_empty() {
            return Err(crate::error::ProxyError::config(
                "auth.jwt_secret is empty and PROXY_JWT_SECRET is not set",
            ));
        }
        Ok(())
    }
}
