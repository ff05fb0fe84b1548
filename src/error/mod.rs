//! Unified error type and `?`-friendly context extension traits.

mod macros;
mod types;

pub use types::*;

/// Result type used throughout the gateway core.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Extension trait for attaching gateway error context to foreign `Result`s
/// and `Option`s at the point a fallible call crosses into our code.
pub trait ErrorContext<T> {
    /// Wraps the error as a config failure.
    fn with_config_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Wraps the error as a database failure.
    fn with_database_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Wraps the error as a network failure.
    fn with_network_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Wraps the error as an invalid-authentication failure.
    fn with_auth_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Wraps the error as a cache failure.
    fn with_cache_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn with_config_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ProxyError::config_with_source(f(), e.into()))
    }

    fn with_database_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ProxyError::database_with_source(f(), e.into()))
    }

    fn with_network_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ProxyError::network_with_source(f(), e.into()))
    }

    fn with_auth_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|_| ProxyError::auth_invalid(f()))
    }

    fn with_cache_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ProxyError::cache_with_source(f(), e.into()))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn with_config_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| ProxyError::config(f()))
    }

    fn with_database_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| ProxyError::database(f()))
    }

    fn with_network_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| ProxyError::network(f()))
    }

    fn with_auth_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| ProxyError::auth_invalid(f()))
    }

    fn with_cache_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| ProxyError::cache(f()))
    }
}
