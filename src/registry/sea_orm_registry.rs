use super::model::{ApiKey, BatchAddResult, Group, GroupExport, GroupSnapshot, ProxyConfig, ProxyKey};
use super::{GroupUpdate, NewGroup, Registry};
use crate::cache::CacheManager;
use crate::error::{ErrorContext, ProxyError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::types::{ProviderKind, SelectionPolicy, hash_key, mask_key};
use crate::{linfo, lwarn};
use async_trait::async_trait;
use entity::{api_keys, groups, key_health, model_health, provider_health, proxy_key_group_allowlist, proxy_keys};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Sea-orm backed `Registry`, fronted by a moka snapshot cache.
pub struct SeaOrmRegistry {
    db: Arc<DatabaseConnection>,
    cache: Arc<CacheManager>,
}

impl SeaOrmRegistry {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, cache: Arc<CacheManager>) -> Self {
        Self { db, cache }
    }

    fn group_from_row(row: groups::Model) -> Result<Group> {
        let model_list: Vec<String> = serde_json::from_str(&row.model_list)
            .map_err(|e| ProxyError::registry_conflict(format!("malformed model_list: {e}")))?;
        let alias_map: HashMap<String, String> = serde_json::from_str(&row.alias_map)
            .map_err(|e| ProxyError::registry_conflict(format!("malformed alias_map: {e}")))?;
        let extra_headers: HashMap<String, String> = row
            .extra_headers
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| ProxyError::registry_conflict(format!("malformed extra_headers: {e}")))?
            .unwrap_or_default();
        let proxy_config: Option<ProxyConfig> = row
            .proxy_config
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| ProxyError::registry_conflict(format!("malformed proxy_config: {e}")))?;
        let provider_kind = ProviderKind::parse(&row.provider_kind).ok_or_else(|| {
            ProxyError::registry_conflict(format!("unknown provider_kind: {}", row.provider_kind))
        })?;

        Ok(Group {
            id: row.id,
            name: row.name,
            provider_kind,
            base_url: row.base_url,
            model_list,
            alias_map,
            enabled: row.enabled,
            health_check_enabled: row.health_check_enabled,
            timeout_seconds: row.timeout_seconds.max(0) as u32,
            max_retries: row.max_retries.max(0) as u32,
            connect_timeout_seconds: row.connect_timeout_seconds.max(0) as u32,
            proxy_config,
            extra_headers,
            selection_policy: SelectionPolicy::parse(&row.selection_policy),
            deleted: row.deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn key_from_row(row: api_keys::Model) -> ApiKey {
        ApiKey {
            id: row.id,
            group_id: row.group_id,
            masked: mask_key(&row.secret),
            secret: row.secret,
            hash: row.hash,
            position: row.position,
            last_status_code: row.last_status_code,
            created_at: row.created_at,
        }
    }

    async fn load_snapshot(
        txn: &DatabaseTransaction,
        group_id: i32,
    ) -> Result<Option<GroupSnapshot>> {
        let Some(row) = groups::Entity::find_by_id(group_id)
            .one(txn)
            .await
            .with_database_context(|| "loading group".to_string())?
        else {
            return Ok(None);
        };
        let group = Self::group_from_row(row)?;

        let key_rows = api_keys::Entity::find()
            .filter(api_keys::Column::GroupId.eq(group_id))
            .order_by_asc(api_keys::Column::Position)
            .all(txn)
            .await
            .with_database_context(|| "loading group keys".to_string())?;
        let keys = key_rows.into_iter().map(Self::key_from_row).collect();

        Ok(Some(GroupSnapshot { group, keys }))
    }

    async fn invalidate(&self, group_id: i32) {
        self.cache.invalidate(group_id).await;
    }
}

#[async_trait]
impl Registry for SeaOrmRegistry {
    async fn list_groups(&self, include_deleted: bool) -> Result<Vec<Group>> {
        let mut query = groups::Entity::find();
        if !include_deleted {
            query = query.filter(groups::Column::Deleted.eq(false));
        }
        let rows = query
            .order_by_asc(groups::Column::Id)
            .all(self.db.as_ref())
            .await
            .with_database_context(|| "listing groups".to_string())?;
        rows.into_iter().map(Self::group_from_row).collect()
    }

    async fn get_group(&self, id: i32) -> Result<Option<Group>> {
        let Some(row) = groups::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .with_database_context(|| "loading group".to_string())?
        else {
            return Ok(None);
        };
        Ok(Some(Self::group_from_row(row)?))
    }

    async fn group_keys(&self, id: i32) -> Result<Vec<ApiKey>> {
        let rows = api_keys::Entity::find()
            .filter(api_keys::Column::GroupId.eq(id))
            .order_by_asc(api_keys::Column::Position)
            .all(self.db.as_ref())
            .await
            .with_database_context(|| "loading group keys".to_string())?;
        Ok(rows.into_iter().map(Self::key_from_row).collect())
    }

    async fn group_snapshot(&self, id: i32) -> Result<Option<Arc<GroupSnapshot>>> {
        if let Some(cached) = self.cache.get(id).await {
            return Ok(Some(cached));
        }

        let txn = self
            .db
            .begin()
            .await
            .with_database_context(|| "starting snapshot transaction".to_string())?;
        let snapshot = Self::load_snapshot(&txn, id).await?;
        txn.commit()
            .await
            .with_database_context(|| "committing snapshot transaction".to_string())?;

        let Some(snapshot) = snapshot else {
            return Ok(None);
        };
        let snapshot = Arc::new(snapshot);
        self.cache.insert(id, Arc::clone(&snapshot)).await;
        Ok(Some(snapshot))
    }

    async fn usable_groups_for_kind(
        &self,
        kind: ProviderKind,
    ) -> Result<Vec<Arc<GroupSnapshot>>> {
        let rows = groups::Entity::find()
            .filter(groups::Column::Deleted.eq(false))
            .filter(groups::Column::Enabled.eq(true))
            .filter(groups::Column::ProviderKind.eq(kind.as_str()))
            .all(self.db.as_ref())
            .await
            .with_database_context(|| "listing groups by provider kind".to_string())?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(snapshot) = self.group_snapshot(row.id).await? {
                if snapshot.is_usable() {
                    snapshots.push(snapshot);
                }
            }
        }
        Ok(snapshots)
    }

    async fn create_group(&self, new_group: NewGroup) -> Result<Group> {
        let model_list = serde_json::to_string(&new_group.model_list)
            .with_config_context(|| "serializing model_list".to_string())?;
        let alias_map = serde_json::to_string(&new_group.alias_map)
            .with_config_context(|| "serializing alias_map".to_string())?;
        let extra_headers = serde_json::to_string(&new_group.extra_headers)
            .with_config_context(|| "serializing extra_headers".to_string())?;
        let proxy_config = new_group
            .proxy_config
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .with_config_context(|| "serializing proxy_config".to_string())?;

        let now = chrono::Utc::now();
        let active = groups::ActiveModel {
            name: Set(new_group.name),
            provider_kind: Set(new_group.provider_kind.as_str().to_string()),
            base_url: Set(new_group.base_url),
            model_list: Set(model_list),
            alias_map: Set(alias_map),
            enabled: Set(true),
            health_check_enabled: Set(new_group.health_check_enabled),
            timeout_seconds: Set(new_group.timeout_seconds as i32),
            max_retries: Set(new_group.max_retries as i32),
            connect_timeout_seconds: Set(new_group.connect_timeout_seconds as i32),
            proxy_config: Set(proxy_config),
            extra_headers: Set(Some(extra_headers)),
            selection_policy: Set(new_group.selection_policy.as_str().to_string()),
            deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let row = active
            .insert(self.db.as_ref())
            .await
            .with_database_context(|| "creating group".to_string())?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Registry,
            "group_created",
            "created group",
            group_id = row.id
        );

        Self::group_from_row(row)
    }

    async fn update_group(&self, id: i32, update: GroupUpdate) -> Result<Group> {
        let row = groups::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .with_database_context(|| "loading group for update".to_string())?
            .ok_or_else(|| ProxyError::registry_conflict(format!("group {id} not found")))?;

        let mut active: groups::ActiveModel = row.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(base_url) = update.base_url {
            active.base_url = Set(base_url);
        }
        if let Some(model_list) = update.model_list {
            active.model_list = Set(serde_json::to_string(&model_list)
                .with_config_context(|| "serializing model_list".to_string())?);
        }
        if let Some(alias_map) = update.alias_map {
            active.alias_map = Set(serde_json::to_string(&alias_map)
                .with_config_context(|| "serializing alias_map".to_string())?);
        }
        if let Some(enabled) = update.enabled {
            active.enabled = Set(enabled);
        }
        if let Some(health_check_enabled) = update.health_check_enabled {
            active.health_check_enabled = Set(health_check_enabled);
        }
        if let Some(timeout_seconds) = update.timeout_seconds {
            active.timeout_seconds = Set(timeout_seconds as i32);
        }
        if let Some(max_retries) = update.max_retries {
            active.max_retries = Set(max_retries as i32);
        }
        if let Some(connect_timeout_seconds) = update.connect_timeout_seconds {
            active.connect_timeout_seconds = Set(connect_timeout_seconds as i32);
        }
        if let Some(proxy_config) = update.proxy_config {
            active.proxy_config = Set(proxy_config
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .with_config_context(|| "serializing proxy_config".to_string())?);
        }
        if let Some(extra_headers) = update.extra_headers {
            active.extra_headers = Set(Some(
                serde_json::to_string(&extra_headers)
                    .with_config_context(|| "serializing extra_headers".to_string())?,
            ));
        }
        if let Some(selection_policy) = update.selection_policy {
            active.selection_policy = Set(selection_policy.as_str().to_string());
        }
        active.updated_at = Set(chrono::Utc::now());

        let row = active
            .update(self.db.as_ref())
            .await
            .with_database_context(|| "updating group".to_string())?;

        self.invalidate(id).await;
        Self::group_from_row(row)
    }

    async fn delete_group(&self, id: i32) -> Result<()> {
        let row = groups::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .with_database_context(|| "loading group for delete".to_string())?
            .ok_or_else(|| ProxyError::registry_conflict(format!("group {id} not found")))?;

        if row.deleted {
            return Err(ProxyError::registry_conflict(format!(
                "group {id} already deleted"
            )));
        }

        let txn = self
            .db
            .begin()
            .await
            .with_database_context(|| "starting delete transaction".to_string())?;

        key_health::Entity::delete_many()
            .filter(key_health::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .with_database_context(|| "cascading key_health delete".to_string())?;
        model_health::Entity::delete_many()
            .filter(model_health::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .with_database_context(|| "cascading model_health delete".to_string())?;
        provider_health::Entity::delete_many()
            .filter(provider_health::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .with_database_context(|| "cascading provider_health delete".to_string())?;

        let mut active: groups::ActiveModel = row.into();
        active.deleted = Set(true);
        active.updated_at = Set(chrono::Utc::now());
        active
            .update(&txn)
            .await
            .with_database_context(|| "soft-deleting group".to_string())?;

        txn.commit()
            .await
            .with_database_context(|| "committing delete transaction".to_string())?;

        self.invalidate(id).await;
        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Registry,
            "group_deleted",
            "soft-deleted group",
            group_id = id
        );
        Ok(())
    }

    async fn add_key(&self, group_id: i32, raw_key: String) -> Result<BatchAddResult> {
        self.batch_add_keys(group_id, vec![raw_key]).await
    }

    async fn batch_add_keys(&self, group_id: i32, raw_keys: Vec<String>) -> Result<BatchAddResult> {
        let mut result = BatchAddResult::default();

        let existing = api_keys::Entity::find()
            .filter(api_keys::Column::GroupId.eq(group_id))
            .all(self.db.as_ref())
            .await
            .with_database_context(|| "loading existing keys".to_string())?;
        let mut seen_hashes: std::collections::HashSet<String> =
            existing.iter().map(|k| k.hash.clone()).collect();
        let mut next_position = existing.iter().map(|k| k.position).max().unwrap_or(-1) + 1;

        for raw in raw_keys {
            if raw.is_empty() {
                result.errors.push("empty key string".to_string());
                continue;
            }
            let hash = hash_key(&raw);
            if seen_hashes.contains(&hash) {
                result.skipped += 1;
                continue;
            }

            let active = api_keys::ActiveModel {
                group_id: Set(group_id),
                secret: Set(raw),
                hash: Set(hash.clone()),
                masked: Set(String::new()),
                position: Set(next_position),
                last_status_code: Set(None),
                created_at: Set(chrono::Utc::now()),
                ..Default::default()
            };
            match active.insert(self.db.as_ref()).await {
                Ok(_) => {
                    seen_hashes.insert(hash);
                    next_position += 1;
                    result.added += 1;
                }
                Err(e) => result.errors.push(e.to_string()),
            }
        }

        self.invalidate(group_id).await;
        Ok(result)
    }

    async fn remove_key(&self, group_id: i32, key_hash: &str) -> Result<()> {
        api_keys::Entity::delete_many()
            .filter(api_keys::Column::GroupId.eq(group_id))
            .filter(api_keys::Column::Hash.eq(key_hash))
            .exec(self.db.as_ref())
            .await
            .with_database_context(|| "removing key".to_string())?;
        key_health::Entity::delete_many()
            .filter(key_health::Column::GroupId.eq(group_id))
            .filter(key_health::Column::KeyHash.eq(key_hash))
            .exec(self.db.as_ref())
            .await
            .with_database_context(|| "removing key health row".to_string())?;
        self.invalidate(group_id).await;
        Ok(())
    }

    async fn clear_invalid_keys(&self) -> Result<usize> {
        let invalid = api_keys::Entity::find()
            .filter(api_keys::Column::LastStatusCode.eq(401))
            .all(self.db.as_ref())
            .await
            .with_database_context(|| "finding invalid keys".to_string())?;

        let count = invalid.len();
        let mut affected_groups = std::collections::HashSet::new();
        for key in &invalid {
            affected_groups.insert(key.group_id);
        }

        api_keys::Entity::delete_many()
            .filter(api_keys::Column::LastStatusCode.eq(401))
            .exec(self.db.as_ref())
            .await
            .with_database_context(|| "clearing invalid keys".to_string())?;

        for group_id in affected_groups {
            self.invalidate(group_id).await;
        }

        if count > 0 {
            lwarn!(
                "system",
                LogStage::HealthCheck,
                LogComponent::Registry,
                "clear_invalid_keys",
                "removed keys with sticky 401 status",
                count = count
            );
        }
        Ok(count)
    }

    async fn record_key_status(&self, group_id: i32, key_hash: &str, status: u16) -> Result<()> {
        if let Some(row) = api_keys::Entity::find()
            .filter(api_keys::Column::GroupId.eq(group_id))
            .filter(api_keys::Column::Hash.eq(key_hash))
            .one(self.db.as_ref())
            .await
            .with_database_context(|| "loading key for status update".to_string())?
        {
            let mut active: api_keys::ActiveModel = row.into();
            active.last_status_code = Set(Some(i32::from(status)));
            active
                .update(self.db.as_ref())
                .await
                .with_database_context(|| "recording key status".to_string())?;
            self.invalidate(group_id).await;
        }
        Ok(())
    }

    async fn proxy_key_by_secret(&self, secret: &str) -> Result<Option<ProxyKey>> {
        let hash = hash_key(secret);
        let Some(row) = proxy_keys::Entity::find()
            .filter(proxy_keys::Column::Hash.eq(&hash))
            .one(self.db.as_ref())
            .await
            .with_database_context(|| "loading proxy key".to_string())?
        else {
            return Ok(None);
        };

        let allowlist = proxy_key_group_allowlist::Entity::find()
            .filter(proxy_key_group_allowlist::Column::ProxyKeyId.eq(row.id))
            .all(self.db.as_ref())
            .await
            .with_database_context(|| "loading proxy key allowlist".to_string())?
            .into_iter()
            .map(|r| r.group_id)
            .collect();

        Ok(Some(ProxyKey {
            id: row.id,
            hash: row.hash,
            masked: row.masked,
            name: row.name,
            enabled: row.enabled,
            created_at: row.created_at,
            group_allowlist: allowlist,
        }))
    }

    async fn export(&self, group_ids: &[i32]) -> Result<Vec<GroupExport>> {
        let mut exports = Vec::with_capacity(group_ids.len());
        for &id in group_ids {
            let Some(group) = self.get_group(id).await? else {
                continue;
            };
            let keys = self.group_keys(id).await?;
            exports.push(GroupExport {
                name: group.name,
                provider_kind: group.provider_kind.as_str().to_string(),
                base_url: group.base_url,
                model_list: group.model_list,
                alias_map: group.alias_map,
                enabled: group.enabled,
                health_check_enabled: group.health_check_enabled,
                timeout_seconds: group.timeout_seconds,
                max_retries: group.max_retries,
                connect_timeout_seconds: group.connect_timeout_seconds,
                proxy_config: group.proxy_config,
                extra_headers: group.extra_headers,
                selection_policy: group.selection_policy.as_str().to_string(),
                keys: keys.into_iter().map(|k| k.secret).collect(),
            });
        }
        Ok(exports)
    }

    async fn import(&self, exports: Vec<GroupExport>) -> Result<Vec<Group>> {
        let mut imported = Vec::with_capacity(exports.len());
        for export in exports {
            let provider_kind = ProviderKind::parse(&export.provider_kind).ok_or_else(|| {
                ProxyError::registry_conflict(format!(
                    "unknown provider_kind in import: {}",
                    export.provider_kind
                ))
            })?;
            let group = self
                .create_group(NewGroup {
                    name: export.name,
                    provider_kind,
                    base_url: export.base_url,
                    model_list: export.model_list,
                    alias_map: export.alias_map,
                    health_check_enabled: export.health_check_enabled,
                    timeout_seconds: export.timeout_seconds,
                    max_retries: export.max_retries,
                    connect_timeout_seconds: export.connect_timeout_seconds,
                    proxy_config: export.proxy_config,
                    extra_headers: export.extra_headers,
                    selection_policy: SelectionPolicy::parse(&export.selection_policy),
                })
                .await?;
            if !export.enabled {
                self.update_group(
                    group.id,
                    GroupUpdate {
                        enabled: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
            }
            self.batch_add_keys(group.id, export.keys).await?;
            imported.push(self.get_group(group.id).await?.ok_or_else(|| {
                ProxyError::internal("group vanished immediately after import")
            })?);
        }
        Ok(imported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_resolve_model_is_idempotent() {
        let mut alias_map = HashMap::new();
        alias_map.insert("gpt-4".to_string(), "deepseek-chat".to_string());
        let group = Group {
            id: 1,
            name: "g".to_string(),
            provider_kind: ProviderKind::OpenAiCompatibleChat,
            base_url: "https://example.com".to_string(),
            model_list: vec!["deepseek-chat".to_string()],
            alias_map,
            enabled: true,
            health_check_enabled: true,
            timeout_seconds: 30,
            max_retries: 0,
            connect_timeout_seconds: 10,
            proxy_config: None,
            extra_headers: HashMap::new(),
            selection_policy: SelectionPolicy::RoundRobin,
            deleted: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let resolved = group.resolve_model("gpt-4").unwrap();
        assert_eq!(resolved, "deepseek-chat");
        assert_eq!(group.resolve_model(&resolved), Some(resolved));
        assert_eq!(group.resolve_model("unknown-alias"), None);
    }
}
