use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProxyKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProxyKeys::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProxyKeys::Hash).string_len(64).not_null())
                    .col(ColumnDef::new(ProxyKeys::Masked).string_len(64).not_null())
                    .col(ColumnDef::new(ProxyKeys::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(ProxyKeys::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ProxyKeys::CreatedAt)
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
                    .name("idx_proxy_keys_hash")
                    .table(ProxyKeys::Table)
                    .col(ProxyKeys::Hash)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProxyKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum ProxyKeys {
    Table,
    Id,
    Hash,
    Masked,
    Name,
    Enabled,
    CreatedAt,
}
