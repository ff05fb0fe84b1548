//! Domain representations of the registry's persisted rows, decoded from
//! their JSON-encoded columns. Nothing under `registry` reaches into
//! `entity::*` outside `sea_orm_registry.rs` — the rest of the crate only
//! ever sees these typed views.

use crate::types::{ProviderKind, SelectionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outbound proxy a group routes its upstream calls through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProxyConfig {
    None,
    Http {
        url: String,
        #[serde(default)]
        bypass_local: bool,
        #[serde(default)]
        bypass_domains: Vec<String>,
    },
    /// Falls back to `Http` transparently when the runtime has no native
    /// SOCKS5 support; the fallback itself is logged once at client-build
    /// time, not modeled here.
    Socks5 {
        url: String,
        #[serde(default)]
        bypass_local: bool,
        #[serde(default)]
        bypass_domains: Vec<String>,
    },
}

impl ProxyConfig {
    /// SHA-256 digest of the canonical serialized form, used as half of the
    /// HTTP client pool cache key. Never includes anything beyond what is
    /// already serialized (no separate password field to leak).
    #[must_use]
    pub fn digest(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        crate::types::hash_key(&String::from_utf8_lossy(&encoded))
    }
}

/// A provider configuration unit: base URL, ordered key list, model
/// authorization set, and per-group policy knobs.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: i32,
    pub name: String,
    pub provider_kind: ProviderKind,
    pub base_url: String,
    pub model_list: Vec<String>,
    pub alias_map: HashMap<String, String>,
    pub enabled: bool,
    pub health_check_enabled: bool,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub connect_timeout_seconds: u32,
    pub proxy_config: Option<ProxyConfig>,
    pub extra_headers: HashMap<String, String>,
    pub selection_policy: SelectionPolicy,
    pub deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Group {
    /// A group is usable iff enabled, not soft-deleted, and has at least
    /// one key — disabled and soft-deleted are tracked as distinct states
    /// (see DESIGN.md's resolution of the open question).
    #[must_use]
    pub fn is_usable(&self, key_count: usize) -> bool {
        self.enabled && !self.deleted && key_count > 0
    }

    /// Resolves an alias (or canonical id) to the canonical model id,
    /// returning `None` if it cannot be resolved to a served model.
    /// Idempotent: resolving an already-canonical id returns it unchanged.
    #[must_use]
    pub fn resolve_model(&self, requested: &str) -> Option<String> {
        if self.model_list.iter().any(|m| m == requested) {
            return Some(requested.to_string());
        }
        let target = self.alias_map.get(requested)?;
        if self.model_list.iter().any(|m| m == target) {
            Some(target.clone())
        } else {
            None
        }
    }
}

/// One configured upstream key string belonging to a group.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: i32,
    pub group_id: i32,
    pub secret: String,
    pub hash: String,
    pub masked: String,
    pub position: i32,
    pub last_status_code: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Opaque bearer a client presents to the gateway.
#[derive(Debug, Clone)]
pub struct ProxyKey {
    pub id: i32,
    pub hash: String,
    pub masked: String,
    pub name: String,
    pub enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Group ids this proxy key is restricted to; empty means unrestricted.
    pub group_allowlist: Vec<i32>,
}

impl ProxyKey {
    #[must_use]
    pub fn allows_group(&self, group_id: i32) -> bool {
        self.group_allowlist.is_empty() || self.group_allowlist.contains(&group_id)
    }
}

/// A group and its ordered key list, read atomically so the selector never
/// sees a group whose keys were mutated mid-read.
#[derive(Debug, Clone)]
pub struct GroupSnapshot {
    pub group: Group,
    pub keys: Vec<ApiKey>,
}

impl GroupSnapshot {
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.group.is_usable(self.keys.len())
    }
}

/// Result of a batch key-add operation, per spec: duplicates (by hash) are
/// a skip, not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchAddResult {
    pub added: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// A group export blob, round-trippable through `import` modulo timestamps
/// and ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupExport {
    pub name: String,
    pub provider_kind: String,
    pub base_url: String,
    pub model_list: Vec<String>,
    pub alias_map: HashMap<String, String>,
    pub enabled: bool,
    pub health_check_enabled: bool,
    pub timeout_seconds: u32,
    pub max_retries: u32,
    pub connect_timeout_seconds: u32,
    pub proxy_config: Option<ProxyConfig>,
    pub extra_headers: HashMap<String, String>,
    pub selection_policy: String,
    pub keys: Vec<String>,
}
