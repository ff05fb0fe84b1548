//! Canonical store of groups, their keys, and proxy-key bindings.
//!
//! Every read sees a consistent per-group snapshot (keys and model list read
//! atomically); writes are idempotent where the spec calls for it (batch-add
//! of a duplicate key is a skip, not an error). Soft-delete is the only
//! deletion model for groups.

mod model;
mod sea_orm_registry;

pub use model::{ApiKey, BatchAddResult, Group, GroupExport, GroupSnapshot, ProxyConfig, ProxyKey};
pub use sea_orm_registry::SeaOrmRegistry;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// New-group fields accepted by `create_group`; id and timestamps are
/// assigned by the registry.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub provider_kind: crate::types::ProviderKind,
    pub base_url: String,
    pub model_list: Vec<String>,
    pub alias_map: HashMap<String, String>,
    pub health_check_enabled: bool,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub connect_timeout_seconds: u32,
    pub proxy_config: Option<ProxyConfig>,
    pub extra_headers: HashMap<String, String>,
    pub selection_policy: crate::types::SelectionPolicy,
}

/// Patch applied by `update_group`; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub model_list: Option<Vec<String>>,
    pub alias_map: Option<HashMap<String, String>>,
    pub enabled: Option<bool>,
    pub health_check_enabled: Option<bool>,
    pub timeout_seconds: Option<u32>,
    pub max_retries: Option<u32>,
    pub connect_timeout_seconds: Option<u32>,
    pub proxy_config: Option<Option<ProxyConfig>>,
    pub extra_headers: Option<HashMap<String, String>>,
    pub selection_policy: Option<crate::types::SelectionPolicy>,
}

/// Contract the dispatcher, selector, and admin surface consume. Named
/// exactly per the operations the component design calls for.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn list_groups(&self, include_deleted: bool) -> Result<Vec<Group>>;
    async fn get_group(&self, id: i32) -> Result<Option<Group>>;
    async fn group_keys(&self, id: i32) -> Result<Vec<ApiKey>>;
    /// Reads group + keys atomically, through the snapshot cache.
    async fn group_snapshot(&self, id: i32) -> Result<Option<Arc<GroupSnapshot>>>;
    /// All usable (enabled, non-deleted, ≥1 key) groups matching a dialect,
    /// for cross-group `/v1` selection.
    async fn usable_groups_for_kind(
        &self,
        kind: crate::types::ProviderKind,
    ) -> Result<Vec<Arc<GroupSnapshot>>>;

    async fn create_group(&self, new_group: NewGroup) -> Result<Group>;
    async fn update_group(&self, id: i32, update: GroupUpdate) -> Result<Group>;
    async fn delete_group(&self, id: i32) -> Result<()>;

    async fn add_key(&self, group_id: i32, raw_key: String) -> Result<BatchAddResult>;
    async fn batch_add_keys(&self, group_id: i32, raw_keys: Vec<String>) -> Result<BatchAddResult>;
    async fn remove_key(&self, group_id: i32, key_hash: &str) -> Result<()>;
    /// Removes every key across all groups whose `last_status_code == 401`.
    async fn clear_invalid_keys(&self) -> Result<usize>;
    /// Records the upstream status observed for a key, used by
    /// `clear_invalid_keys` and surfaced in admin views.
    async fn record_key_status(&self, group_id: i32, key_hash: &str, status: u16) -> Result<()>;

    async fn proxy_key_by_secret(&self, secret: &str) -> Result<Option<ProxyKey>>;

    async fn export(&self, group_ids: &[i32]) -> Result<Vec<GroupExport>>;
    async fn import(&self, exports: Vec<GroupExport>) -> Result<Vec<Group>>;
}
