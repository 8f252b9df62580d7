//! Bulk product import from uploaded CSV and Excel files.
//!
//! An upload is acknowledged synchronously: the raw bytes are stashed under
//! temp storage, a pending job record is created, and a detached task is
//! spawned to parse and import the rows. The job record is the only channel
//! between that task and later status polls, so every observable outcome
//! (progress, per-row errors, failure) lives there.

use std::sync::Arc;

use catalog_common::{AppError, AppResult, IdGenerator, StorageBackend, StoredFile, generate_storage_key};
use catalog_db::{
    entities::{JobStatus, category, upload_job},
    repositories::{CategoryRepository, NewProduct, ProductRepository, UploadJobRepository},
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use super::tabular::{self, RawRow};

/// Rows per insert batch. Bounds memory and transaction size for large files
/// while keeping progress updates frequent enough to poll.
const BATCH_SIZE: usize = 500;

/// Cap on the job listing.
const JOB_LIST_LIMIT: u64 = 50;

/// Terminal jobs older than this many days are swept by default.
const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Acknowledgment returned to the uploader before processing starts.
#[derive(Debug, Serialize)]
pub struct UploadSubmission {
    pub message: String,
    pub job_id: String,
    pub status: JobStatus,
}

/// An upload job as returned by status polls and the job listing.
///
/// `progress` is derived at read time; the stored record only carries the
/// raw counters.
#[derive(Debug, Clone, Serialize)]
pub struct UploadJobView {
    pub id: String,
    pub file_name: String,
    pub status: JobStatus,
    pub total_rows: i32,
    pub processed_rows: i32,
    pub success_count: i32,
    pub failed_count: i32,
    /// Whole-number percentage, 0 until `total_rows` is known.
    pub progress: i32,
    pub error_message: Option<String>,
    pub errors: Option<serde_json::Value>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub completed_at: Option<DateTime<FixedOffset>>,
}

impl From<upload_job::Model> for UploadJobView {
    fn from(job: upload_job::Model) -> Self {
        Self {
            progress: progress_percent(job.processed_rows, job.total_rows),
            id: job.id,
            file_name: job.file_name,
            status: job.status,
            total_rows: job.total_rows,
            processed_rows: job.processed_rows,
            success_count: job.success_count,
            failed_count: job.failed_count,
            error_message: job.error_message,
            errors: job.errors,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }
}

/// One rejected row. Accumulated across batches, never reset.
#[derive(Debug, Clone, Serialize)]
struct RowError {
    /// 1-indexed position over the whole file, headers excluded.
    row: usize,
    /// The row's name when it has one, otherwise `Row {n}`.
    identifier: String,
    error: String,
}

/// Final counters of one import run.
struct ImportOutcome {
    processed: i32,
    success: i32,
    failed: i32,
    errors: Vec<RowError>,
}

/// Bulk upload service: accepts files and drives detached import jobs.
#[derive(Clone)]
pub struct BulkUploadService {
    upload_job_repo: UploadJobRepository,
    product_repo: ProductRepository,
    category_repo: CategoryRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl BulkUploadService {
    /// Create a new bulk upload service.
    #[must_use]
    pub fn new(
        upload_job_repo: UploadJobRepository,
        product_repo: ProductRepository,
        category_repo: CategoryRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            upload_job_repo,
            product_repo,
            category_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Accept an uploaded file and start a detached import job.
    ///
    /// The extension gate runs before anything is persisted, so a rejected
    /// upload leaves neither a file nor a job record behind. The returned
    /// acknowledgment carries the job ID to poll.
    pub async fn submit(&self, file_name: &str, data: &[u8]) -> AppResult<UploadSubmission> {
        if !is_allowed_extension(file_name) {
            return Err(AppError::BadRequest(
                "Invalid file type. Only CSV and XLSX files are allowed".to_string(),
            ));
        }

        let key = generate_storage_key("temp", file_name);
        let stored = self.storage.write(&key, data).await?;

        let job = self
            .upload_job_repo
            .create(self.id_gen.generate(), file_name.to_string())
            .await?;

        tracing::info!(
            job_id = %job.id,
            file_name = %file_name,
            size = stored.size,
            "accepted bulk upload"
        );

        let task = self.clone();
        let job_id = job.id.clone();
        let original_name = file_name.to_string();
        // Fire and forget: the job record is the only way to observe the task.
        tokio::spawn(async move {
            task.run_import(&job_id, &stored, &original_name).await;
        });

        Ok(UploadSubmission {
            message: "File upload started. Processing in background.".to_string(),
            job_id: job.id,
            status: job.status,
        })
    }

    /// Fetch one job with derived progress.
    pub async fn status(&self, job_id: &str) -> AppResult<UploadJobView> {
        let job = self.upload_job_repo.get_by_id(job_id).await?;
        Ok(UploadJobView::from(job))
    }

    /// List recent jobs, newest first, capped at 50.
    pub async fn list_jobs(&self) -> AppResult<Vec<UploadJobView>> {
        let jobs = self.upload_job_repo.find_recent(JOB_LIST_LIMIT).await?;
        Ok(jobs.into_iter().map(UploadJobView::from).collect())
    }

    /// Delete terminal jobs older than `days` (default 30).
    ///
    /// Returns the number of deleted job records.
    pub async fn cleanup(&self, days: Option<i64>) -> AppResult<u64> {
        let days = days.unwrap_or(DEFAULT_RETENTION_DAYS);
        let cutoff = Utc::now().fixed_offset() - Duration::days(days);
        let deleted = self.upload_job_repo.delete_finished_before(cutoff).await?;

        tracing::info!(deleted, days, "swept old upload jobs");

        Ok(deleted)
    }

    /// Drive one upload job to a terminal state.
    ///
    /// Errors raised while recording a failure are logged and dropped; the
    /// triggering request has long since returned, so nobody upstream is
    /// listening. The temp file is deleted on success and failure alike.
    async fn run_import(&self, job_id: &str, stored: &StoredFile, original_name: &str) {
        if let Err(e) = self.import_file(job_id, stored, original_name).await {
            tracing::error!(job_id = %job_id, error = %e, "bulk upload job failed");
            if let Err(mark_err) = self.upload_job_repo.mark_failed(job_id, &e.to_string()).await {
                tracing::error!(job_id = %job_id, error = %mark_err, "failed to record job failure");
            }
        }

        if let Err(e) = self.storage.delete(&stored.key).await {
            tracing::warn!(job_id = %job_id, error = %e, "failed to delete temp upload file");
        }
    }

    async fn import_file(
        &self,
        job_id: &str,
        stored: &StoredFile,
        original_name: &str,
    ) -> AppResult<()> {
        self.upload_job_repo.mark_processing(job_id).await?;

        let rows = tabular::parse_rows(&stored.path, original_name)?;
        self.upload_job_repo
            .set_total_rows(job_id, rows.len() as i32)
            .await?;

        let outcome = self.process_rows(job_id, &rows).await?;
        self.upload_job_repo
            .mark_completed(
                job_id,
                outcome.processed,
                outcome.success,
                outcome.failed,
                errors_json(&outcome.errors),
            )
            .await?;

        tracing::info!(
            job_id = %job_id,
            total = rows.len(),
            success = outcome.success,
            failed = outcome.failed,
            "bulk upload job completed"
        );

        Ok(())
    }

    /// Import rows in bounded batches, isolating failures per row.
    ///
    /// Row failures are folded into the error list and never abort the run;
    /// only infrastructure errors (batch insert, progress write) escape and
    /// fail the job.
    async fn process_rows(&self, job_id: &str, rows: &[RawRow]) -> AppResult<ImportOutcome> {
        let total = rows.len();
        let mut errors: Vec<RowError> = Vec::new();
        let mut success_count = 0_i32;
        let mut failed_count = 0_i32;
        let mut processed = 0_i32;

        // One snapshot serves every name lookup in this job.
        let categories = self.category_repo.find_all_unpaged().await?;

        let mut batch_start = 0;
        for batch in rows.chunks(BATCH_SIZE) {
            let mut to_insert = Vec::new();

            for (j, row) in batch.iter().enumerate() {
                let row_number = batch_start + j + 1;
                match self.build_product(row, &categories).await {
                    Ok(product) => {
                        to_insert.push(product);
                        success_count += 1;
                    }
                    Err(message) => {
                        errors.push(RowError {
                            row: row_number,
                            identifier: row_identifier(row, row_number),
                            error: message,
                        });
                        failed_count += 1;
                    }
                }
            }

            if !to_insert.is_empty() {
                self.product_repo.insert_batch(to_insert).await?;
            }

            processed = (batch_start + BATCH_SIZE).min(total) as i32;
            self.upload_job_repo
                .update_progress(job_id, processed, success_count, failed_count, errors_json(&errors))
                .await?;

            batch_start += BATCH_SIZE;
        }

        Ok(ImportOutcome {
            processed,
            success: success_count,
            failed: failed_count,
            errors,
        })
    }

    /// Validate one row and shape it for insertion.
    ///
    /// `Err` carries the row error message. Lookup failures are folded into
    /// that message space too, since the row outcome is all the uploader
    /// ever sees.
    async fn build_product(
        &self,
        row: &RawRow,
        categories: &[category::Model],
    ) -> Result<NewProduct, String> {
        let name = field(row, "name");
        let price_raw = field(row, "price");
        if name.is_empty() || price_raw.is_empty() {
            return Err("Name and price are required".to_string());
        }
        let Ok(price) = price_raw.parse::<f64>() else {
            return Err("Name and price are required".to_string());
        };

        let mut category_id = field(row, "category_id").to_string();
        let category_name = field(row, "category_name");

        // A name is only consulted when no ID was given.
        if category_id.is_empty() && !category_name.is_empty() {
            let wanted = category_name.to_lowercase();
            match categories.iter().find(|c| c.name.to_lowercase() == wanted) {
                Some(category) => category_id = category.id.clone(),
                None => {
                    return Err(format!(
                        "Invalid category: Category '{category_name}' not found"
                    ));
                }
            }
        }

        if category_id.is_empty() {
            return Err("Category ID or Category Name is required".to_string());
        }

        // The ID may come straight off the row, so re-check it against the
        // store before trusting it as a foreign key.
        match self.category_repo.find_by_id(&category_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(format!("Category with ID {category_id} not found"));
            }
            Err(e) => return Err(e.to_string()),
        }

        Ok(NewProduct {
            id: self.id_gen.generate(),
            name: name.to_string(),
            // Imported rows always carry an image value, empty when blank.
            image: Some(field(row, "image").to_string()),
            price,
            unique_id: self.id_gen.generate(),
            category_id,
        })
    }
}

/// Whole-number completion percentage; 0 until the total is known.
fn progress_percent(processed: i32, total: i32) -> i32 {
    if total <= 0 {
        0
    } else {
        (f64::from(processed) / f64::from(total) * 100.0).round() as i32
    }
}

fn is_allowed_extension(file_name: &str) -> bool {
    matches!(
        tabular::file_extension(file_name).as_deref(),
        Some("csv" | "xlsx" | "xls")
    )
}

/// Fetch a cell by normalized header, empty when the column is missing.
fn field<'a>(row: &'a RawRow, key: &str) -> &'a str {
    row.get(key).map_or("", String::as_str)
}

fn row_identifier(row: &RawRow, row_number: usize) -> String {
    let name = field(row, "name");
    if name.is_empty() {
        format!("Row {row_number}")
    } else {
        name.to_string()
    }
}

fn errors_json(errors: &[RowError]) -> Option<serde_json::Value> {
    if errors.is_empty() {
        None
    } else {
        serde_json::to_value(errors).ok()
    }
}
