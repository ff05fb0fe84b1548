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
                    .table(HealthCheckEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HealthCheckEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckEvents::GroupId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HealthCheckEvents::CheckType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(HealthCheckEvents::KeyHash).string_len(64))
                    .col(ColumnDef::new(HealthCheckEvents::ModelId).string_len(255))
                    .col(ColumnDef::new(HealthCheckEvents::StatusCode).integer())
                    .col(ColumnDef::new(HealthCheckEvents::ResponseMs).integer())
                    .col(
                        ColumnDef::new(HealthCheckEvents::Success)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HealthCheckEvents::Error).text())
                    .col(
                        ColumnDef::new(HealthCheckEvents::CheckedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_health_check_events_group_id")
                            .from(HealthCheckEvents::Table, HealthCheckEvents::GroupId)
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
                    .name("idx_health_check_events_group_checked_at")
                    .table(HealthCheckEvents::Table)
                    .col(HealthCheckEvents::GroupId)
                    .col(HealthCheckEvents::CheckedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HealthCheckEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum HealthCheckEvents {
    Table,
    Id,
    GroupId,
    CheckType,
    KeyHash,
    ModelId,
    StatusCode,
    ResponseMs,
    Success,
    Error,
    CheckedAt,
}
