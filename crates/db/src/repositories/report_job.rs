//! Report job repository.

use std::sync::Arc;

use catalog_common::{AppError, AppResult};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{JobStatus, ReportFormat, ReportJob, report_job};

/// Report job repository for database operations.
#[derive(Clone)]
pub struct ReportJobRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportJobRepository {
    /// Create a new report job repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report job by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report_job::Model>> {
        ReportJob::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report job by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report_job::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report job with ID {id} not found")))
    }

    /// Find the most recent report jobs.
    pub async fn find_recent(&self, limit: u64) -> AppResult<Vec<report_job::Model>> {
        ReportJob::find()
            .order_by_desc(report_job::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new pending report job.
    ///
    /// The filters snapshot and expiry are fixed at creation and never
    /// rewritten afterwards.
    pub async fn create(
        &self,
        id: String,
        format: ReportFormat,
        filters: serde_json::Value,
        expires_at: DateTime<FixedOffset>,
    ) -> AppResult<report_job::Model> {
        let now = Utc::now().fixed_offset();

        let model = report_job::ActiveModel {
            id: Set(id),
            format: Set(format),
            status: Set(JobStatus::Pending),
            filters: Set(filters),
            file_path: Set(None),
            download_url: Set(None),
            total_records: Set(0),
            error_message: Set(None),
            expires_at: Set(Some(expires_at)),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a report job as processing.
    pub async fn mark_processing(&self, id: &str) -> AppResult<report_job::Model> {
        let job = self.get_by_id(id).await?;
        let mut active: report_job::ActiveModel = job.into();
        active.status = Set(JobStatus::Processing);
        active.updated_at = Set(Utc::now().fixed_offset());
        self.save(active).await
    }

    /// Record how many products the report query matched.
    pub async fn set_total_records(
        &self,
        id: &str,
        total_records: i32,
    ) -> AppResult<report_job::Model> {
        let job = self.get_by_id(id).await?;
        let mut active: report_job::ActiveModel = job.into();
        active.total_records = Set(total_records);
        active.updated_at = Set(Utc::now().fixed_offset());
        self.save(active).await
    }

    /// Mark a report job as completed with its output location.
    pub async fn mark_completed(
        &self,
        id: &str,
        file_path: String,
        download_url: String,
    ) -> AppResult<report_job::Model> {
        let now = Utc::now().fixed_offset();
        let job = self.get_by_id(id).await?;
        let mut active: report_job::ActiveModel = job.into();
        active.status = Set(JobStatus::Completed);
        active.file_path = Set(Some(file_path));
        active.download_url = Set(Some(download_url));
        active.updated_at = Set(now);
        active.completed_at = Set(Some(now));
        self.save(active).await
    }

    /// Mark a report job as failed.
    pub async fn mark_failed(&self, id: &str, error_message: &str) -> AppResult<report_job::Model> {
        let now = Utc::now().fixed_offset();
        let job = self.get_by_id(id).await?;
        let mut active: report_job::ActiveModel = job.into();
        active.status = Set(JobStatus::Failed);
        active.error_message = Set(Some(error_message.to_string()));
        active.updated_at = Set(now);
        active.completed_at = Set(Some(now));
        self.save(active).await
    }

    /// Persist a status transition.
    async fn save(&self, active: report_job::ActiveModel) -> AppResult<report_job::Model> {
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find completed jobs whose download expiry has passed.
    pub async fn find_expired(
        &self,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<report_job::Model>> {
        ReportJob::find()
            .filter(report_job::Column::Status.eq(JobStatus::Completed))
            .filter(report_job::Column::ExpiresAt.lt(now))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report job.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        ReportJob::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
