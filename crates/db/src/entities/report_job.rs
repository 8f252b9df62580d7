//! Report job entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::job_status::JobStatus;

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma-separated values.
    #[sea_orm(string_value = "csv")]
    Csv,
    /// Excel workbook.
    #[sea_orm(string_value = "xlsx")]
    Xlsx,
}

/// A report export job.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report_job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Output format.
    pub format: ReportFormat,

    /// Current status.
    pub status: JobStatus,

    /// Snapshot of the requested filters, immutable after creation.
    #[sea_orm(column_type = "JsonBinary")]
    pub filters: Json,

    /// Path to the generated file (set on completion).
    #[sea_orm(nullable)]
    pub file_path: Option<String>,

    /// Download URL (set on completion).
    #[sea_orm(nullable)]
    pub download_url: Option<String>,

    /// Number of products the report query matched, recorded before the
    /// file is written.
    #[sea_orm(default_value = 0)]
    pub total_records: i32,

    /// Fatal error message if the job failed.
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    /// When the download expires.
    #[sea_orm(nullable)]
    pub expires_at: Option<DateTimeWithTimeZone>,

    /// When this job was created.
    pub created_at: DateTimeWithTimeZone,

    /// When this job was last updated.
    pub updated_at: DateTimeWithTimeZone,

    /// When this job reached a terminal status.
    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
