//! The opaque bearer secret a client presents to the dispatcher.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proxy_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Lowercase SHA-256 hex digest of the presented secret.
    pub hash: String,
    pub masked: String,
    pub name: String,
    pub enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
