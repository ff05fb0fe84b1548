use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Groups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Groups::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Groups::ProviderKind)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Groups::BaseUrl).string_len(1000).not_null())
                    .col(
                        ColumnDef::new(Groups::ModelList)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Groups::AliasMap)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Groups::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Groups::HealthCheckEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Groups::TimeoutSeconds)
                            .integer()
                            .not_null()
                            .default(30),
                    )
                    .col(
                        ColumnDef::new(Groups::MaxRetries)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Groups::ConnectTimeoutSeconds)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(ColumnDef::new(Groups::ProxyConfig).text())
                    .col(ColumnDef::new(Groups::ExtraHeaders).text())
                    .col(
                        ColumnDef::new(Groups::SelectionPolicy)
                            .string_len(32)
                            .not_null()
                            .default("round_robin"),
                    )
                    .col(
                        ColumnDef::new(Groups::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Groups::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_groups_enabled_deleted")
                    .table(Groups::Table)
                    .col(Groups::Enabled)
                    .col(Groups::Deleted)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Groups {
    Table,
    Id,
    Name,
    ProviderKind,
    BaseUrl,
    ModelList,
    AliasMap,
    Enabled,
    HealthCheckEnabled,
    TimeoutSeconds,
    MaxRetries,
    ConnectTimeoutSeconds,
    ProxyConfig,
    ExtraHeaders,
    SelectionPolicy,
    Deleted,
    CreatedAt,
    UpdatedAt,
}
