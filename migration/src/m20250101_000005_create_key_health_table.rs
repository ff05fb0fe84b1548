use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_groups_table::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(KeyHealth::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(KeyHealth::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(KeyHealth::GroupId).integer().not_null())
                    .col(ColumnDef::new(KeyHealth::KeyHash).string_len(64).not_null())
                    .col(
                        ColumnDef::new(KeyHealth::ConsecutiveFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(KeyHealth::TotalChecks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(KeyHealth::SuccessfulChecks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(KeyHealth::LastStatusCode).integer())
                    .col(ColumnDef::new(KeyHealth::LastCheckedAt).timestamp())
                    .col(ColumnDef::new(KeyHealth::LastSuccessAt).timestamp())
                    .col(ColumnDef::new(KeyHealth::LastFailureAt).timestamp())
                    .col(
                        ColumnDef::new(KeyHealth::AvgResponseMs)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_key_health_group_id")
                            .from(KeyHealth::Table, KeyHealth::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_key_health_group_key")
                    .table(KeyHealth::Table)
                    .col(KeyHealth::GroupId)
                    .col(KeyHealth::KeyHash)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(KeyHealth::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum KeyHealth {
    Table,
    Id,
    GroupId,
    KeyHash,
    ConsecutiveFailures,
    TotalChecks,
    SuccessfulChecks,
    LastStatusCode,
    LastCheckedAt,
    LastSuccessAt,
    LastFailureAt,
    AvgResponseMs,
}
