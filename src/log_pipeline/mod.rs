//! Async log pipeline: a bounded queue in front of a single background
//! worker that batches writes against `request_logs`, the way the teacher's
//! background tasks pair a command channel with a `tokio::select!` loop and
//! a graceful `JoinHandle` shutdown (`src/key_pool/api_key_rate_limit_reset_task.rs`).

mod worker;

pub use worker::{LogItem, LogPipeline, NewRequestLog, QueueStats, RequestLogUpdate};
