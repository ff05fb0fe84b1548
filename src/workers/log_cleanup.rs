//! Deletes `request_logs` rows past the configured retention horizon and
//! `VACUUM`s the database when rows were actually removed.

use crate::config::LogCleanupConfig;
use crate::error::{ErrorContext, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{linfo, lwarn};
use entity::request_logs;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

const STARTUP_GRACE: Duration = Duration::from_secs(45);

pub struct LogCleanupWorker {
    db: Arc<DatabaseConnection>,
    config: LogCleanupConfig,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl LogCleanupWorker {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, config: LogCleanupConfig) -> Self {
        Self {
            db,
            config,
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let db = Arc::clone(&self.db);
        let retention_days = self.config.retention_days;
        let interval = Duration::from_secs(self.config.interval_hours * 3600);
        let run_on_startup = self.config.cleanup_on_startup;

        let handle = tokio::spawn(async move {
            if run_on_startup {
                if let Err(e) = sweep(&db, retention_days).await {
                    lwarn!(
                        "system",
                        LogStage::Startup,
                        LogComponent::Worker,
                        "log_cleanup_startup_failed",
                        "startup log cleanup sweep failed",
                        error = %e
                    );
                }
            } else {
                tokio::time::sleep(STARTUP_GRACE).await;
            }

            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = sweep(&db, retention_days).await {
                    lwarn!(
                        "system",
                        LogStage::Logging,
                        LogComponent::Worker,
                        "log_cleanup_failed",
                        "log cleanup sweep failed",
                        error = %e
                    );
                }
            }
        });

        *self.task_handle.write().await = Some(handle);
        Ok(())
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.task_handle.write().await.take() {
            handle.abort();
        }
    }
}

async fn sweep(db: &Arc<DatabaseConnection>, retention_days: u32) -> Result<()> {
    let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(retention_days));

    let result = request_logs::Entity::delete_many()
        .filter(request_logs::Column::ArrivalTime.lt(cutoff))
        .exec(db.as_ref())
        .await
        .with_database_context(|| "deleting expired request_logs rows".to_string())?;

    if result.rows_affected > 0 {
        linfo!(
            "system",
            LogStage::Logging,
            LogComponent::Worker,
            "log_cleanup_swept",
            "removed expired request_logs rows",
            removed = result.rows_affected
        );

        db.as_ref()
            .execute_unprepared("VACUUM")
            .await
            .with_database_context(|| "running VACUUM after log cleanup".to_string())?;
    }

    Ok(())
}
