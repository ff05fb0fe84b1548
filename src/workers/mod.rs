//! Background workers started and stopped by `AppTasks` through the
//! teacher's `TaskScheduler`: health probing, key recovery, and log
//! cleanup. Each follows the same shape as the teacher's own background
//! tasks — `start()`/`stop()` over an `Arc<RwLock<Option<JoinHandle>>>`,
//! a startup grace period, and `tokio::select!` against a shutdown signal.

mod health_prober;
mod key_recovery;
mod log_cleanup;

pub use health_prober::HealthProber;
pub use key_recovery::KeyRecoveryWorker;
pub use log_cleanup::LogCleanupWorker;
