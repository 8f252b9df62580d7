//! Upload job entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::job_status::JobStatus;

/// A bulk upload job.
///
/// Counters only grow while a job runs, and `success_count + failed_count`
/// never exceeds `processed_rows`, which never exceeds `total_rows`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Original client-supplied file name.
    pub file_name: String,

    /// Current status.
    pub status: JobStatus,

    /// Total data rows in the parsed file.
    #[sea_orm(default_value = 0)]
    pub total_rows: i32,

    /// Rows processed so far.
    #[sea_orm(default_value = 0)]
    pub processed_rows: i32,

    /// Rows inserted as products.
    #[sea_orm(default_value = 0)]
    pub success_count: i32,

    /// Rows rejected by validation.
    #[sea_orm(default_value = 0)]
    pub failed_count: i32,

    /// Fatal error message if the job failed.
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    /// Per-row errors (JSON array), present only when rows failed.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub errors: Option<Json>,

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
