//! Structured logging: `tracing` initialization plus the `linfo!`/`lwarn!`/
//! `lerror!`/`ldebug!` macro surface used throughout the codebase to stamp
//! every log record with a request id, a pipeline stage, and a component.

use std::env;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Coarse stage of request/background-task processing a log record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Configuration,
    Authentication,
    Scheduling,
    HealthCheck,
    Dispatch,
    Upstream,
    Logging,
    Shutdown,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::Scheduling => "scheduling",
            Self::HealthCheck => "health_check",
            Self::Dispatch => "dispatch",
            Self::Upstream => "upstream",
            Self::Logging => "logging",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Subsystem that emitted a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Config,
    Database,
    Registry,
    HttpPool,
    Provider,
    Selector,
    Health,
    Dispatcher,
    LogPipeline,
    Worker,
    Admin,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Database => "database",
            Self::Registry => "registry",
            Self::HttpPool => "http_pool",
            Self::Provider => "provider",
            Self::Selector => "selector",
            Self::Health => "health",
            Self::Dispatcher => "dispatcher",
            Self::LogPipeline => "log_pipeline",
            Self::Worker => "worker",
            Self::Admin => "admin",
        }
    }
}

/// Emits a `tracing::info!` event tagged with a request id, stage, component
/// and event name, matching the call-site shape used everywhere in this
/// codebase: `linfo!(request_id, LogStage::X, LogComponent::Y, "event_name",
/// "human message", field = value, ...)`.
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            component = $component.as_str(),
            event = $event,
            $($field = $value,)*
            "{}", $msg
        );
    };
}

/// Same shape as [`linfo!`] at debug level.
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::debug!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            component = $component.as_str(),
            event = $event,
            $($field = $value,)*
            "{}", $msg
        );
    };
}

/// Same shape as [`linfo!`] at warn level.
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::warn!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            component = $component.as_str(),
            event = $event,
            $($field = $value,)*
            "{}", $msg
        );
    };
}

/// Same shape as [`linfo!`] at error level.
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $event:expr, $msg:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::error!(
            request_id = %$request_id,
            stage = $stage.as_str(),
            component = $component.as_str(),
            event = $event,
            $($field = $value,)*
            "{}", $msg
        );
    };
}

/// SQL query formatting for the database tracing layer: cleans whitespace
/// and picks an operation icon, matching what the teacher's query log line
/// looked like.
pub struct DbQueryFormatter;

impl DbQueryFormatter {
    #[must_use]
    pub fn format_sqlx_query(
        statement: &str,
        elapsed_ms: f64,
        rows_affected: Option<u64>,
    ) -> String {
        let clean_sql = Self::clean_sql_statement(statement);
        let icon = Self::operation_icon(&clean_sql);
        let time_str = if elapsed_ms >= 1000.0 {
            format!("{:.2}s", elapsed_ms / 1000.0)
        } else {
            format!("{elapsed_ms:.2}ms")
        };
        let affected = rows_affected
            .filter(|n| *n > 0)
            .map(|n| format!(" -> {n} rows"))
            .unwrap_or_default();
        format!("{icon} {clean_sql} ({time_str}){affected}")
    }

    fn clean_sql_statement(statement: &str) -> String {
        statement
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn operation_icon(sql: &str) -> &'static str {
        let upper = sql.to_uppercase();
        if upper.starts_with("SELECT") {
            "select"
        } else if upper.starts_with("INSERT") {
            "insert"
        } else if upper.starts_with("UPDATE") {
            "update"
        } else if upper.starts_with("DELETE") {
            "delete"
        } else if upper.starts_with("CREATE") {
            "create"
        } else {
            "query"
        }
    }
}

/// A `tracing-subscriber` layer dedicated to SQL query logs, filtered
/// independently from the rest of the application's log level.
pub struct DatabaseLogLayer;

impl DatabaseLogLayer {
    #[must_use]
    pub fn new() -> impl Layer<tracing_subscriber::Registry> {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_filter(EnvFilter::new("sqlx::query=info,sea_orm::query=info"))
    }
}

/// Initializes the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter, which quiets query-level SQL logging unless opted into.
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let default_filter =
        format!("{level},llm_gateway=debug,sqlx::query=warn,sea_orm::query=warn");
    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
