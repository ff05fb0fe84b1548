use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RequestLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequestLogs::RequestId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RequestLogs::ProxyKeyId).integer())
                    .col(
                        ColumnDef::new(RequestLogs::ArrivalTime)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestLogs::Method).string_len(16).not_null())
                    .col(ColumnDef::new(RequestLogs::Path).string_len(512).not_null())
                    .col(ColumnDef::new(RequestLogs::ModelRequested).string_len(255))
                    .col(ColumnDef::new(RequestLogs::ModelResolved).string_len(255))
                    .col(ColumnDef::new(RequestLogs::GroupId).integer())
                    .col(ColumnDef::new(RequestLogs::ProviderKind).string_len(32))
                    .col(ColumnDef::new(RequestLogs::KeyHash).string_len(64))
                    .col(ColumnDef::new(RequestLogs::ClientIp).string_len(64))
                    .col(ColumnDef::new(RequestLogs::UserAgent).string_len(512))
                    .col(
                        ColumnDef::new(RequestLogs::IsStreaming)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RequestLogs::HasTools)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(RequestLogs::PromptTokens).integer())
                    .col(ColumnDef::new(RequestLogs::CompletionTokens).integer())
                    .col(ColumnDef::new(RequestLogs::TotalTokens).integer())
                    .col(ColumnDef::new(RequestLogs::StatusCode).integer())
                    .col(ColumnDef::new(RequestLogs::DurationMs).integer())
                    .col(ColumnDef::new(RequestLogs::ErrorMessage).text())
                    .col(ColumnDef::new(RequestLogs::ResponseBody).text())
                    .col(ColumnDef::new(RequestLogs::ResponseHeaders).text())
                    .col(
                        ColumnDef::new(RequestLogs::ContentTruncated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_logs_arrival_time")
                    .table(RequestLogs::Table)
                    .col(RequestLogs::ArrivalTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_logs_group_id")
                    .table(RequestLogs::Table)
                    .col(RequestLogs::GroupId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum RequestLogs {
    Table,
    RequestId,
    ProxyKeyId,
    ArrivalTime,
    Method,
    Path,
    ModelRequested,
    ModelResolved,
    GroupId,
    ProviderKind,
    KeyHash,
    ClientIp,
    UserAgent,
    IsStreaming,
    HasTools,
    PromptTokens,
    CompletionTokens,
    TotalTokens,
    StatusCode,
    DurationMs,
    ErrorMessage,
    ResponseBody,
    ResponseHeaders,
    ContentTruncated,
}
