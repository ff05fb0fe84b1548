//! Error types for the gateway core.
//!
//! One variant per error kind named in the error handling design, plus the
//! ambient kinds (`Config`, `Database`, `Io`, `Serialization`, `Cache`,
//! `Network`) every long-running service needs regardless of domain. Each
//! variant carries a message and an optional `anyhow::Error` source so `?`
//! propagation never loses the underlying cause.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Dialect used to shape an error envelope returned to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDialect {
    /// `{"error": {"message": ..., "type": ...}}`
    OpenAi,
    /// `{"error": {"type": ..., "message": ...}}`
    Anthropic,
}

/// The single error type used across the gateway core.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Configuration file missing, malformed, or failed validation.
    #[error("config error: {message}")]
    Config {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// Database connection or query failure.
    #[error("database error: {message}")]
    Database {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// I/O failure not otherwise categorized.
    #[error("io error: {message}")]
    Io {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// JSON/TOML (de)serialization failure.
    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// Cache backend (moka/redis) failure.
    #[error("cache error: {message}")]
    Cache {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// Outbound HTTP transport failure not tied to a specific upstream call.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// No proxy key / API key supplied on an authenticated route.
    #[error("missing authentication: {message}")]
    AuthMissing { message: String },

    /// Proxy key supplied but not recognized, disabled, or revoked.
    #[error("invalid authentication: {message}")]
    AuthInvalid { message: String },

    /// No group serves the requested model.
    #[error("no group serves this model: {message}")]
    NoViableGroup { message: String },

    /// The model is served, but every candidate key is currently down.
    #[error("no viable key: {message}")]
    NoViableKey { message: String },

    /// Upstream responded with a non-2xx status forwarded to the client.
    #[error("upstream returned {status}: {message}")]
    UpstreamHttpError {
        status: u16,
        message: String,
        body: Option<String>,
    },

    /// Upstream connect/read/write exceeded its deadline.
    #[error("upstream timeout: {message}")]
    UpstreamTimeout { message: String },

    /// Transport-level failure while talking to an upstream.
    #[error("upstream network error: {message}")]
    UpstreamNetwork {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// The client disconnected before a response could be produced.
    #[error("client disconnected: {message}")]
    ClientDisconnect { message: String },

    /// A registry mutation hit a uniqueness/FK constraint.
    #[error("registry conflict: {message}")]
    RegistryConflict { message: String },

    /// A log record was dropped because the pipeline queue was full.
    #[error("log queue full, record dropped: {message}")]
    QueueFullDrop { message: String },

    /// Health state machine bookkeeping failure.
    #[error("health check error: {message}")]
    HealthCheck {
        message: String,
        source: Option<anyhow::Error>,
    },

    /// Catch-all for invariant violations / unexpected internal states.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        source: Option<anyhow::Error>,
    },
}

impl ProxyError {
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn io<T: Into<String>, E: Into<anyhow::Error>>(message: T, source: E) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn serialization<T: Into<String>, E: Into<anyhow::Error>>(message: T, source: E) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    pub fn cache_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Cache {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn network<T: Into<String>>(message: T) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn auth_missing<T: Into<String>>(message: T) -> Self {
        Self::AuthMissing {
            message: message.into(),
        }
    }

    pub fn auth_invalid<T: Into<String>>(message: T) -> Self {
        Self::AuthInvalid {
            message: message.into(),
        }
    }

    pub fn no_viable_group<T: Into<String>>(message: T) -> Self {
        Self::NoViableGroup {
            message: message.into(),
        }
    }

    pub fn no_viable_key<T: Into<String>>(message: T) -> Self {
        Self::NoViableKey {
            message: message.into(),
        }
    }

    pub fn upstream_http_error<T: Into<String>>(
        status: u16,
        message: T,
        body: Option<String>,
    ) -> Self {
        Self::UpstreamHttpError {
            status,
            message: message.into(),
            body,
        }
    }

    pub fn upstream_timeout<T: Into<String>>(message: T) -> Self {
        Self::UpstreamTimeout {
            message: message.into(),
        }
    }

    pub fn upstream_network<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::UpstreamNetwork {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn client_disconnect<T: Into<String>>(message: T) -> Self {
        Self::ClientDisconnect {
            message: message.into(),
        }
    }

    pub fn registry_conflict<T: Into<String>>(message: T) -> Self {
        Self::RegistryConflict {
            message: message.into(),
        }
    }

    pub fn queue_full_drop<T: Into<String>>(message: T) -> Self {
        Self::QueueFullDrop {
            message: message.into(),
        }
    }

    pub fn health_check<T: Into<String>>(message: T) -> Self {
        Self::HealthCheck {
            message: message.into(),
            source: None,
        }
    }

    pub fn health_check_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::HealthCheck {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this error should be logged only, with no client-visible response
    /// (the request's socket is already gone).
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(
            self,
            Self::ClientDisconnect { .. } | Self::QueueFullDrop { .. }
        )
    }

    /// Maps this error to an HTTP status and a machine-readable error code,
    /// independent of dialect envelope shape.
    #[must_use]
    pub fn to_http_status_and_body(&self) -> (StatusCode, &'static str) {
        match self {
            Self::AuthMissing { .. } | Self::AuthInvalid { .. } => {
                (StatusCode::UNAUTHORIZED, "invalid_request")
            }
            Self::NoViableGroup { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::NoViableKey { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
            Self::UpstreamHttpError { status, .. } => {
                let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                (code, "provider_error")
            }
            Self::UpstreamTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "provider_error"),
            Self::UpstreamNetwork { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
            Self::RegistryConflict { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Config { .. }
            | Self::Database { .. }
            | Self::Io { .. }
            | Self::Serialization { .. }
            | Self::Cache { .. }
            | Self::Network { .. }
            | Self::HealthCheck { .. }
            | Self::Internal { .. }
            | Self::ClientDisconnect { .. }
            | Self::QueueFullDrop { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Renders the dialect-specific JSON error envelope body.
    #[must_use]
    pub fn to_dialect_body(&self, dialect: ErrorDialect, code: &str) -> serde_json::Value {
        let message = self.to_string();
        match dialect {
            ErrorDialect::OpenAi => json!({ "error": { "message": message, "type": code } }),
            ErrorDialect::Anthropic => json!({ "error": { "type": code, "message": message } }),
        }
    }

    /// Converts this error into an Axum response using the OpenAI envelope
    /// shape, the default for admin/management endpoints.
    #[must_use]
    pub fn to_axum_response(&self) -> Response {
        let (status, code) = self.to_http_status_and_body();
        (status, Json(self.to_dialect_body(ErrorDialect::OpenAi, code))).into_response()
    }

    /// Converts this error into a response shaped by the given dialect, for
    /// use on the proxy's request path.
    #[must_use]
    pub fn to_dialect_response(&self, dialect: ErrorDialect) -> Response {
        let (status, code) = self.to_http_status_and_body();
        (status, Json(self.to_dialect_body(dialect, code))).into_response()
    }

    /// Converts this error into a `pingora_core::Error` for use inside the
    /// `ProxyHttp` trait implementation's return types.
    #[must_use]
    pub fn to_pingora_error(&self) -> Box<pingora_core::Error> {
        let (status, _) = self.to_http_status_and_body();
        pingora_core::Error::explain(
            pingora_core::ErrorType::HTTPStatus(status.as_u16()),
            self.to_string(),
        )
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        self.to_axum_response()
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<toml::de::Error> for ProxyError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("failed to parse TOML config", err)
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("failed to process JSON", err)
    }
}

impl From<sea_orm::error::DbErr> for ProxyError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("database operation failed", err)
    }
}

impl From<redis::RedisError> for ProxyError {
    fn from(err: redis::RedisError) -> Self {
        Self::cache_with_source("redis operation failed", err)
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::upstream_timeout(err.to_string())
        } else {
            Self::upstream_network("upstream HTTP request failed", err)
        }
    }
}

impl From<notify::Error> for ProxyError {
    fn from(err: notify::Error) -> Self {
        Self::config_with_source("config file watcher failed", err)
    }
}
