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
                    .table(ProviderHealth::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderHealth::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderHealth::GroupId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderHealth::ConsecutiveFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProviderHealth::TotalChecks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ProviderHealth::SuccessfulChecks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProviderHealth::LastStatusCode).integer())
                    .col(ColumnDef::new(ProviderHealth::LastCheckedAt).timestamp())
                    .col(ColumnDef::new(ProviderHealth::LastSuccessAt).timestamp())
                    .col(ColumnDef::new(ProviderHealth::LastFailureAt).timestamp())
                    .col(
                        ColumnDef::new(ProviderHealth::AvgResponseMs)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_health_group_id")
                            .from(ProviderHealth::Table, ProviderHealth::GroupId)
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
                    .name("idx_provider_health_group")
                    .table(ProviderHealth::Table)
                    .col(ProviderHealth::GroupId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProviderHealth::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum ProviderHealth {
    Table,
    Id,
    GroupId,
    ConsecutiveFailures,
    TotalChecks,
    SuccessfulChecks,
    LastStatusCode,
    LastCheckedAt,
    LastSuccessAt,
    LastFailureAt,
    AvgResponseMs,
}
