//! Join table: when present for a `proxy_key_id`, restricts that key to the
//! listed groups; a key with no rows here may use any group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proxy_key_group_allowlist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub proxy_key_id: i32,
    pub group_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
