//! Database connection configuration.

use crate::error::{ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::linfo;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: u64,
    pub query_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/gateway.db".to_string(),
            max_connections: 10,
            connect_timeout: 30,
            query_timeout: 60,
        }
    }
}

impl DatabaseConfig {
    /// Creates the parent directory for a file-backed SQLite database if
    /// it doesn't exist yet.
    pub fn ensure_database_path(&self) -> Result<()> {
        if self.url.starts_with("sqlite://") && !self.url.contains(":memory:") {
            let path_str = self.url.strip_prefix("sqlite://").unwrap_or(&self.url);
            let db_path = Path::new(path_str);

            if let Some(parent) = db_path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ProxyError::config_with_source(
                            format!("failed to create database directory: {}", parent.display()),
                            e,
                        )
                    })?;

                    linfo!(
                        "system",
                        LogStage::Startup,
                        LogComponent::Database,
                        "create_db_dir",
                        "created database directory",
                        path = %parent.display()
                    );
                }
            }
        }

        Ok(())
    }

    /// Returns the connection URL, creating the parent directory first.
    pub fn get_connection_url(&self) -> Result<String> {
        self.ensure_database_path()?;
        Ok(self.url.clone())
    }

    #[must_use]
    pub fn is_memory_database(&self) -> bool {
        self.url.contains(":memory:")
    }
}
