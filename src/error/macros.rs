//! Shorthand macros for constructing `ProxyError` values at call sites.

/// Builds a `ProxyError::Config`.
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::ProxyError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::config(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::Database`.
#[macro_export]
macro_rules! database_error {
    ($msg:expr) => {
        $crate::error::ProxyError::database($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::database(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::Network`.
#[macro_export]
macro_rules! network_error {
    ($msg:expr) => {
        $crate::error::ProxyError::network($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::network(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::AuthInvalid`.
#[macro_export]
macro_rules! auth_error {
    ($msg:expr) => {
        $crate::error::ProxyError::auth_invalid($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::auth_invalid(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::Internal`.
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::ProxyError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::internal(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::Cache`.
#[macro_export]
macro_rules! cache_error {
    ($msg:expr) => {
        $crate::error::ProxyError::cache($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::cache(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::NoViableGroup`.
#[macro_export]
macro_rules! no_viable_group_error {
    ($msg:expr) => {
        $crate::error::ProxyError::no_viable_group($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::no_viable_group(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::NoViableKey`.
#[macro_export]
macro_rules! no_viable_key_error {
    ($msg:expr) => {
        $crate::error::ProxyError::no_viable_key($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::no_viable_key(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::RegistryConflict`.
#[macro_export]
macro_rules! registry_conflict_error {
    ($msg:expr) => {
        $crate::error::ProxyError::registry_conflict($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::registry_conflict(format!($fmt, $($arg)*))
    };
}

/// Builds a `ProxyError::HealthCheck`.
#[macro_export]
macro_rules! health_check_error {
    ($msg:expr) => {
        $crate::error::ProxyError::health_check($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::ProxyError::health_check(format!($fmt, $($arg)*))
    };
}
