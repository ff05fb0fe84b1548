//! Append-only log of individual health probes, bounded by retention.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "health_check_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub group_id: i32,
    /// `provider` | `key` | `model`.
    pub check_type: String,
    pub key_hash: Option<String>,
    pub model_id: Option<String>,
    pub status_code: Option<i32>,
    pub response_ms: Option<i64>,
    pub success: bool,
    pub error: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
