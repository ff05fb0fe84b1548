use crate::registry::GroupSnapshot;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for the group-snapshot cache, derived from `AppConfig`.
#[derive(Debug, Clone, Copy)]
pub struct GroupCacheConfig {
    pub max_capacity: u64,
    pub ttl: Duration,
}

impl Default for GroupCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 4_096,
            ttl: Duration::from_secs(30),
        }
    }
}

/// Caches `GroupSnapshot`s keyed by group id.
///
/// A write to the registry (create/update/delete group, add/remove key)
/// invalidates the affected entry rather than patching it in place, keeping
/// the cache strictly a read accelerator over the single source of truth.
pub struct CacheManager {
    snapshots: Cache<i32, Arc<GroupSnapshot>>,
}

impl CacheManager {
    #[must_use]
    pub fn new(config: GroupCacheConfig) -> Self {
        Self {
            snapshots: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl)
                .build(),
        }
    }

    pub async fn get(&self, group_id: i32) -> Option<Arc<GroupSnapshot>> {
        self.snapshots.get(&group_id).await
    }

    pub async fn insert(&self, group_id: i32, snapshot: Arc<GroupSnapshot>) {
        self.snapshots.insert(group_id, snapshot).await;
    }

    pub async fn invalidate(&self, group_id: i32) {
        self.snapshots.invalidate(&group_id).await;
    }

    pub async fn invalidate_all(&self) {
        self.snapshots.invalidate_all();
    }
}
