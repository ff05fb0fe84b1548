//! One row per configured upstream API key string, belonging to a group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    /// Raw key material, used to inject upstream credentials. Never logged.
    pub secret: String,
    /// Lowercase SHA-256 hex digest of `secret`, used as the lookup key.
    pub hash: String,
    /// First-4...last-4 masked form, safe to surface in admin responses.
    pub masked: String,
    /// Position within the group's ordered key sequence.
    pub position: i32,
    pub last_status_code: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
