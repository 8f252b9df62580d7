//! Upload job repository.

use std::sync::Arc;

use catalog_common::{AppError, AppResult};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{JobStatus, UploadJob, upload_job};

/// Upload job repository for database operations.
#[derive(Clone)]
pub struct UploadJobRepository {
    db: Arc<DatabaseConnection>,
}

impl UploadJobRepository {
    /// Create a new upload job repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an upload job by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<upload_job::Model>> {
        UploadJob::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an upload job by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<upload_job::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload job with ID {id} not found")))
    }

    /// Find the most recent upload jobs.
    pub async fn find_recent(&self, limit: u64) -> AppResult<Vec<upload_job::Model>> {
        UploadJob::find()
            .order_by_desc(upload_job::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new pending upload job with zeroed counters.
    pub async fn create(&self, id: String, file_name: String) -> AppResult<upload_job::Model> {
        let now = Utc::now().fixed_offset();

        let model = upload_job::ActiveModel {
            id: Set(id),
            file_name: Set(file_name),
            status: Set(JobStatus::Pending),
            total_rows: Set(0),
            processed_rows: Set(0),
            success_count: Set(0),
            failed_count: Set(0),
            error_message: Set(None),
            errors: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark an upload job as processing.
    pub async fn mark_processing(&self, id: &str) -> AppResult<upload_job::Model> {
        let job = self.get_by_id(id).await?;
        let mut active: upload_job::ActiveModel = job.into();
        active.status = Set(JobStatus::Processing);
        active.updated_at = Set(Utc::now().fixed_offset());
        self.save(active).await
    }

    /// Record the total row count once the file has been parsed.
    pub async fn set_total_rows(&self, id: &str, total_rows: i32) -> AppResult<upload_job::Model> {
        let job = self.get_by_id(id).await?;
        let mut active: upload_job::ActiveModel = job.into();
        active.total_rows = Set(total_rows);
        active.updated_at = Set(Utc::now().fixed_offset());
        self.save(active).await
    }

    /// Update progress counters after a batch.
    ///
    /// `errors` is only persisted when rows have failed so far.
    pub async fn update_progress(
        &self,
        id: &str,
        processed_rows: i32,
        success_count: i32,
        failed_count: i32,
        errors: Option<serde_json::Value>,
    ) -> AppResult<upload_job::Model> {
        let job = self.get_by_id(id).await?;
        let mut active: upload_job::ActiveModel = job.into();
        active.processed_rows = Set(processed_rows);
        active.success_count = Set(success_count);
        active.failed_count = Set(failed_count);
        if errors.is_some() {
            active.errors = Set(errors);
        }
        active.updated_at = Set(Utc::now().fixed_offset());
        self.save(active).await
    }

    /// Mark an upload job as completed with final counters.
    pub async fn mark_completed(
        &self,
        id: &str,
        processed_rows: i32,
        success_count: i32,
        failed_count: i32,
        errors: Option<serde_json::Value>,
    ) -> AppResult<upload_job::Model> {
        let now = Utc::now().fixed_offset();
        let job = self.get_by_id(id).await?;
        let mut active: upload_job::ActiveModel = job.into();
        active.status = Set(JobStatus::Completed);
        active.processed_rows = Set(processed_rows);
        active.success_count = Set(success_count);
        active.failed_count = Set(failed_count);
        if errors.is_some() {
            active.errors = Set(errors);
        }
        active.updated_at = Set(now);
        active.completed_at = Set(Some(now));
        self.save(active).await
    }

    /// Mark an upload job as failed.
    pub async fn mark_failed(&self, id: &str, error_message: &str) -> AppResult<upload_job::Model> {
        let now = Utc::now().fixed_offset();
        let job = self.get_by_id(id).await?;
        let mut active: upload_job::ActiveModel = job.into();
        active.status = Set(JobStatus::Failed);
        active.error_message = Set(Some(error_message.to_string()));
        active.updated_at = Set(now);
        active.completed_at = Set(Some(now));
        self.save(active).await
    }

    /// Persist a status transition.
    async fn save(&self, active: upload_job::ActiveModel) -> AppResult<upload_job::Model> {
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete terminal jobs that completed before the cutoff.
    ///
    /// Returns the number of deleted records.
    pub async fn delete_finished_before(&self, cutoff: DateTime<FixedOffset>) -> AppResult<u64> {
        UploadJob::delete_many()
            .filter(upload_job::Column::Status.is_in([JobStatus::Completed, JobStatus::Failed]))
            .filter(upload_job::Column::CompletedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await
            .map(|result| result.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
