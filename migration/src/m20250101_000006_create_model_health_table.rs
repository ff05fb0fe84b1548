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
                    .table(ModelHealth::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModelHealth::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModelHealth::GroupId).integer().not_null())
                    .col(
                        ColumnDef::new(ModelHealth::ModelId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModelHealth::ConsecutiveFailures)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ModelHealth::TotalChecks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ModelHealth::SuccessfulChecks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ModelHealth::LastStatusCode).integer())
                    .col(ColumnDef::new(ModelHealth::LastCheckedAt).timestamp())
                    .col(ColumnDef::new(ModelHealth::LastSuccessAt).timestamp())
                    .col(ColumnDef::new(ModelHealth::LastFailureAt).timestamp())
                    .col(
                        ColumnDef::new(ModelHealth::AvgResponseMs)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_model_health_group_id")
                            .from(ModelHealth::Table, ModelHealth::GroupId)
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
                    .name("idx_model_health_group_model")
                    .table(ModelHealth::Table)
                    .col(ModelHealth::GroupId)
                    .col(ModelHealth::ModelId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModelHealth::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum ModelHealth {
    Table,
    Id,
    GroupId,
    ModelId,
    ConsecutiveFailures,
    TotalChecks,
    SuccessfulChecks,
    LastStatusCode,
    LastCheckedAt,
    LastSuccessAt,
    LastFailureAt,
    AvgResponseMs,
}
