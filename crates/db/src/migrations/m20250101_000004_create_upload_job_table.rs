//! Create upload_job table migration.

use sea_orm_migration::prelude::*;

#[derive(Iden)]
enum UploadJob {
    Table,
    Id,
    FileName,
    Status,
    TotalRows,
    ProcessedRows,
    SuccessCount,
    FailedCount,
    ErrorMessage,
    Errors,
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
                    .table(UploadJob::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UploadJob::Id).string_len(36).not_null().primary_key())
                    .col(ColumnDef::new(UploadJob::FileName).string_len(512).not_null())
                    .col(
                        ColumnDef::new(UploadJob::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(UploadJob::TotalRows).integer().not_null().default(0))
                    .col(ColumnDef::new(UploadJob::ProcessedRows).integer().not_null().default(0))
                    .col(ColumnDef::new(UploadJob::SuccessCount).integer().not_null().default(0))
                    .col(ColumnDef::new(UploadJob::FailedCount).integer().not_null().default(0))
                    .col(ColumnDef::new(UploadJob::ErrorMessage).text())
                    .col(ColumnDef::new(UploadJob::Errors).json_binary())
                    .col(
                        ColumnDef::new(UploadJob::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UploadJob::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(UploadJob::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: status (for listing active jobs)
        manager
            .create_index(
                Index::create()
                    .name("upload_job_status_idx")
                    .table(UploadJob::Table)
                    .col(UploadJob::Status)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (recent-first listing)
        manager
            .create_index(
                Index::create()
                    .name("upload_job_created_at_idx")
                    .table(UploadJob::Table)
                    .col(UploadJob::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: completed_at (retention cleanup scans)
        manager
            .create_index(
                Index::create()
                    .name("upload_job_completed_at_idx")
                    .table(UploadJob::Table)
                    .col(UploadJob::CompletedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(UploadJob::Table).to_owned())
            .await
    }
}
