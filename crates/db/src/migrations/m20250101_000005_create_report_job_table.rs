//! Create report_job table migration.

use sea_orm_migration::prelude::*;

#[derive(Iden)]
enum ReportJob {
    Table,
    Id,
    Format,
    Status,
    Filters,
    FilePath,
    DownloadUrl,
    TotalRecords,
    ErrorMessage,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReportJob::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReportJob::Id).string_len(36).not_null().primary_key())
                    .col(ColumnDef::new(ReportJob::Format).string_len(8).not_null())
                    .col(
                        ColumnDef::new(ReportJob::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(ReportJob::Filters).json_binary().not_null())
                    .col(ColumnDef::new(ReportJob::FilePath).string_len(1024))
                    .col(ColumnDef::new(ReportJob::DownloadUrl).string_len(1024))
                    .col(ColumnDef::new(ReportJob::TotalRecords).integer().not_null().default(0))
                    .col(ColumnDef::new(ReportJob::ErrorMessage).text())
                    .col(ColumnDef::new(ReportJob::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ReportJob::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReportJob::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(ReportJob::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: status
        manager
            .create_index(
                Index::create()
                    .name("report_job_status_idx")
                    .table(ReportJob::Table)
                    .col(ReportJob::Status)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (recent-first listing)
        manager
            .create_index(
                Index::create()
                    .name("report_job_created_at_idx")
                    .table(ReportJob::Table)
                    .col(ReportJob::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: expires_at (expiry sweeps)
        manager
            .create_index(
                Index::create()
                    .name("report_job_expires_at_idx")
                    .table(ReportJob::Table)
                    .col(ReportJob::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(ReportJob::Table).to_owned())
            .await
    }
}
