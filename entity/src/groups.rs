//! Group entity: a provider configuration unit.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// One of `openai-compatible-chat`, `openai-compatible-responses`,
    /// `anthropic-native`, `gemini-native`.
    pub provider_kind: String,
    pub base_url: String,
    /// JSON array of model ids this group is authorized to serve.
    pub model_list: String,
    /// JSON object mapping alias -> canonical model id.
    pub alias_map: String,
    pub enabled: bool,
    pub health_check_enabled: bool,
    pub timeout_seconds: i32,
    pub max_retries: i32,
    pub connect_timeout_seconds: i32,
    /// JSON-encoded `ProxyConfig`, absent when the group makes direct calls.
    pub proxy_config: Option<String>,
    /// JSON object of extra headers injected on every outbound call.
    pub extra_headers: Option<String>,
    /// `round_robin` | `random` | `least_load`.
    pub selection_policy: String,
    pub deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
