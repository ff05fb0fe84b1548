use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_groups_table::Groups;
use super::m20250101_000003_create_proxy_keys_table::ProxyKeys;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProxyKeyGroupAllowlist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProxyKeyGroupAllowlist::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProxyKeyGroupAllowlist::ProxyKeyId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProxyKeyGroupAllowlist::GroupId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allowlist_proxy_key_id")
                            .from(
                                ProxyKeyGroupAllowlist::Table,
                                ProxyKeyGroupAllowlist::ProxyKeyId,
                            )
                            .to(ProxyKeys::Table, ProxyKeys::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allowlist_group_id")
                            .from(ProxyKeyGroupAllowlist::Table, ProxyKeyGroupAllowlist::GroupId)
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
                    .name("idx_allowlist_proxy_key_group")
                    .table(ProxyKeyGroupAllowlist::Table)
                    .col(ProxyKeyGroupAllowlist::ProxyKeyId)
                    .col(ProxyKeyGroupAllowlist::GroupId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProxyKeyGroupAllowlist::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum ProxyKeyGroupAllowlist {
    Table,
    Id,
    ProxyKeyId,
    GroupId,
}
