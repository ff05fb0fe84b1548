use crate::cache::{CacheManager, GroupCacheConfig};
use crate::config::AppConfig;
use crate::error::Result;
use crate::http_pool::ClientPool;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Base resources shared by every service and task: config, the database
/// handle, the registry snapshot cache, and the outbound client pool.
pub struct AppResources {
    config: Arc<AppConfig>,
    database: Arc<DatabaseConnection>,
    cache: Arc<CacheManager>,
    http_pool: Arc<ClientPool>,
}

impl AppResources {
    pub fn build(config: Arc<AppConfig>, database: Arc<DatabaseConnection>) -> Result<Arc<Self>> {
        let cache = Arc::new(CacheManager::new(GroupCacheConfig::default()));
        let http_pool = Arc::new(ClientPool::new());
        Ok(Arc::new(Self {
            config,
            database,
            cache,
            http_pool,
        }))
    }

    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn database(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.database)
    }

    #[must_use]
    pub fn cache(&self) -> Arc<CacheManager> {
        Arc::clone(&self.cache)
    }

    #[must_use]
    pub fn http_pool(&self) -> Arc<ClientPool> {
        Arc::clone(&self.http_pool)
    }
}
