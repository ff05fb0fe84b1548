//! Database connection setup and migration runner.

use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, linfo, lwarn};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;

/// Opens the database connection, creating the SQLite file and its parent
/// directory first if they do not exist yet.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connect",
        "connecting to database",
        url = %redact_url(database_url)
    );

    if let Some(path) = sqlite_file_path(database_url) {
        ensure_sqlite_file(path)?;
    }

    let db = Database::connect(database_url).await?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connect_ok",
        "database connection established"
    );
    Ok(db)
}

fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    if path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

fn ensure_sqlite_file(path: &Path) -> Result<(), DbErr> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            ldebug!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "create_db_dir",
                "creating database directory",
                dir = %parent.display()
            );
            std::fs::create_dir_all(parent).map_err(|e| {
                DbErr::Custom(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
    }

    if !path.exists() {
        ldebug!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "create_db_file",
            "creating database file",
            path = %path.display()
        );
        std::fs::File::create(path)
            .map_err(|e| DbErr::Custom(format!("failed to create {}: {e}", path.display())))?;
    }

    Ok(())
}

fn redact_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        "<redacted>".to_string()
    }
}

/// Applies every pending migration.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "migration_start",
        "running database migrations"
    );

    match migration::Migrator::up(db, None).await {
        Ok(()) => {
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migration_ok",
                "database migrations complete"
            );
            Ok(())
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Database,
                "migration_fail",
                "database migrations failed",
                error = %e
            );
            Err(e)
        }
    }
}

/// Logs (but does not fail on) any migrations still pending application.
pub async fn check_database_status(db: &DatabaseConnection) -> Result<(), DbErr> {
    let pending = migration::Migrator::get_pending_migrations(db).await?;

    if pending.is_empty() {
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "migrations_applied",
            "all migrations applied"
        );
    } else {
        lwarn!(
            "system",
            LogStage::Startup,
            LogComponent::Database,
            "pending_migrations",
            "pending migrations detected",
            count = pending.len()
        );
    }

    Ok(())
}
