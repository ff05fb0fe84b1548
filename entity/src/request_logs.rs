//! One row per client request, created on arrival and updated on completion.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "request_logs")]
pub struct Model {
    /// Generated request id, unique per request.
    #[sea_orm(primary_key, auto_increment = false)]
    pub request_id: String,
    pub proxy_key_id: Option<i32>,
    pub arrival_time: chrono::DateTime<chrono::Utc>,
    pub method: String,
    pub path: String,
    pub model_requested: Option<String>,
    pub model_resolved: Option<String>,
    pub group_id: Option<i32>,
    pub provider_kind: Option<String>,
    pub key_hash: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub is_streaming: bool,
    pub has_tools: bool,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub status_code: Option<i32>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    /// Truncated to `request_logging.truncate_body_to` bytes.
    pub response_body: Option<String>,
    pub response_headers: Option<String>,
    pub content_truncated: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
