//! Filtered product report export.
//!
//! A report request snapshots its filters onto a job record together with a
//! fixed 24-hour download expiry, then a detached task queries matching
//! products, renders them to CSV or XLSX and stores the file. Downloads
//! re-validate status, file presence and expiry on every read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use catalog_common::{AppError, AppResult, IdGenerator, StorageBackend, is_v4_uuid};
use catalog_db::{
    entities::{JobStatus, ReportFormat, category, product, report_job},
    repositories::{ProductRepository, ReportFilterQuery, ReportJobRepository},
};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How long a finished report stays downloadable.
const EXPIRY_HOURS: i64 = 24;

/// Cap on the job listing.
const JOB_LIST_LIMIT: u64 = 50;

/// Column layout shared by both output formats.
const REPORT_COLUMNS: [&str; 9] = [
    "Product ID",
    "Unique ID",
    "Product Name",
    "Price",
    "Category ID",
    "Category Name",
    "Image",
    "Created At",
    "Updated At",
];

/// Worksheet name used for XLSX output.
const REPORT_SHEET_NAME: &str = "Products";

/// Filter predicate narrowing a report's result set.
///
/// Snapshotted as JSON onto the job record at creation; absent fields are
/// not stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<FixedOffset>>,
}

impl ReportFilters {
    fn to_query(&self) -> ReportFilterQuery {
        ReportFilterQuery {
            category_id: self.category_id.clone(),
            category_name: self.category_name.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Input for generating a report. Every field is optional.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct GenerateReportInput {
    /// Output format, CSV when absent.
    pub format: Option<ReportFormat>,

    /// Exact category ID match; must be a v4 UUID when present.
    pub category_id: Option<String>,

    /// Case-insensitive substring match on category name.
    pub category_name: Option<String>,

    #[validate(range(min = 0.0))]
    pub min_price: Option<f64>,

    #[validate(range(min = 0.0))]
    pub max_price: Option<f64>,

    /// Lower bound on product creation time (RFC 3339).
    pub start_date: Option<DateTime<FixedOffset>>,

    /// Upper bound on product creation time (RFC 3339).
    pub end_date: Option<DateTime<FixedOffset>>,
}

impl GenerateReportInput {
    fn into_filters(self) -> ReportFilters {
        ReportFilters {
            category_id: self.category_id,
            category_name: self.category_name,
            min_price: self.min_price,
            max_price: self.max_price,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Acknowledgment returned to the requester before generation starts.
#[derive(Debug, Serialize)]
pub struct ReportSubmission {
    pub message: String,
    pub job_id: String,
    pub status: JobStatus,
    pub format: ReportFormat,
    pub expires_at: Option<DateTime<FixedOffset>>,
}

/// A report job as returned by status polls and the job listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReportJobView {
    pub id: String,
    pub format: ReportFormat,
    pub status: JobStatus,
    pub filters: serde_json::Value,
    pub download_url: Option<String>,
    pub total_records: i32,
    pub error_message: Option<String>,
    pub expires_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub completed_at: Option<DateTime<FixedOffset>>,
}

impl From<report_job::Model> for ReportJobView {
    fn from(job: report_job::Model) -> Self {
        Self {
            id: job.id,
            format: job.format,
            status: job.status,
            filters: job.filters,
            download_url: job.download_url,
            total_records: job.total_records,
            error_message: job.error_message,
            expires_at: job.expires_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }
}

/// Everything the download endpoint needs to stream a finished report.
#[derive(Debug, Clone)]
pub struct ReportDownload {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
}

/// Report service: accepts filter snapshots and drives detached export jobs.
#[derive(Clone)]
pub struct ReportService {
    report_job_repo: ReportJobRepository,
    product_repo: ProductRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub fn new(
        report_job_repo: ReportJobRepository,
        product_repo: ProductRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            report_job_repo,
            product_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Validate the filters and start a detached report job.
    ///
    /// The expiry window starts at creation, not completion, so a slow
    /// generation eats into the download window rather than extending it.
    pub async fn generate(&self, input: GenerateReportInput) -> AppResult<ReportSubmission> {
        input.validate()?;
        if let Some(id) = &input.category_id
            && !is_v4_uuid(id)
        {
            return Err(AppError::Validation("Invalid category ID".to_string()));
        }

        let format = input.format.unwrap_or(ReportFormat::Csv);
        let filters = input.into_filters();
        let filters_json = serde_json::to_value(&filters)
            .map_err(|e| AppError::Internal(format!("Failed to encode report filters: {e}")))?;
        let expires_at = Utc::now().fixed_offset() + Duration::hours(EXPIRY_HOURS);

        let job = self
            .report_job_repo
            .create(self.id_gen.generate(), format, filters_json, expires_at)
            .await?;

        tracing::info!(job_id = %job.id, format = ?format, "accepted report job");

        let task = self.clone();
        let job_id = job.id.clone();
        // Fire and forget: the job record is the only way to observe the task.
        tokio::spawn(async move {
            task.run_report(&job_id, format, &filters).await;
        });

        Ok(ReportSubmission {
            message: "Report generation started. Processing in background.".to_string(),
            job_id: job.id,
            status: job.status,
            format,
            expires_at: job.expires_at,
        })
    }

    /// Fetch one job.
    pub async fn status(&self, job_id: &str) -> AppResult<ReportJobView> {
        let job = self.report_job_repo.get_by_id(job_id).await?;
        Ok(ReportJobView::from(job))
    }

    /// List recent jobs, newest first, capped at 50.
    pub async fn list_jobs(&self) -> AppResult<Vec<ReportJobView>> {
        let jobs = self.report_job_repo.find_recent(JOB_LIST_LIMIT).await?;
        Ok(jobs.into_iter().map(ReportJobView::from).collect())
    }

    /// Re-validate a finished report and hand back its file for streaming.
    ///
    /// Expiry is enforced here on every read, not just at completion time.
    pub async fn download(&self, job_id: &str) -> AppResult<ReportDownload> {
        let job = self.report_job_repo.get_by_id(job_id).await?;

        if job.status != JobStatus::Completed {
            return Err(AppError::BadRequest("Report is not ready yet".to_string()));
        }

        let path = job
            .file_path
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| p.exists())
            .ok_or_else(|| AppError::NotFound("Report file not found".to_string()))?;

        if let Some(expires_at) = job.expires_at
            && Utc::now().fixed_offset() > expires_at
        {
            return Err(AppError::BadRequest("Report has expired".to_string()));
        }

        let file_name = path.file_name().map_or_else(
            || report_file_name(job_id, job.format),
            |name| name.to_string_lossy().into_owned(),
        );

        Ok(ReportDownload {
            path,
            file_name,
            content_type: content_type(job.format),
        })
    }

    /// Delete completed jobs whose download window has passed.
    ///
    /// The backing file goes first (missing files are ignored), then the
    /// record. Failed and unfinished jobs are left to the age-based sweep.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let now = Utc::now().fixed_offset();
        let expired = self.report_job_repo.find_expired(now).await?;

        let mut deleted = 0_u64;
        for job in expired {
            if let Some(file_path) = &job.file_path
                && let Err(e) = self.storage.delete(&storage_key(file_path)).await
            {
                tracing::warn!(job_id = %job.id, error = %e, "failed to delete expired report file");
            }
            self.report_job_repo.delete(&job.id).await?;
            deleted += 1;
        }

        tracing::info!(deleted, "swept expired reports");

        Ok(deleted)
    }

    /// Drive one report job to a terminal state.
    ///
    /// Errors raised while recording a failure are logged and dropped; the
    /// triggering request has long since returned.
    async fn run_report(&self, job_id: &str, format: ReportFormat, filters: &ReportFilters) {
        if let Err(e) = self.build_report(job_id, format, filters).await {
            tracing::error!(job_id = %job_id, error = %e, "report job failed");
            if let Err(mark_err) = self.report_job_repo.mark_failed(job_id, &e.to_string()).await {
                tracing::error!(job_id = %job_id, error = %mark_err, "failed to record job failure");
            }
        }
    }

    async fn build_report(
        &self,
        job_id: &str,
        format: ReportFormat,
        filters: &ReportFilters,
    ) -> AppResult<()> {
        self.report_job_repo.mark_processing(job_id).await?;

        let products = self.product_repo.find_for_report(&filters.to_query()).await?;
        self.report_job_repo
            .set_total_records(job_id, products.len() as i32)
            .await?;

        let bytes = match format {
            ReportFormat::Csv => render_csv(&products)?,
            ReportFormat::Xlsx => render_xlsx(&products)?,
        };

        let file_name = report_file_name(job_id, format);
        let stored = self
            .storage
            .write(&format!("reports/{file_name}"), &bytes)
            .await?;

        self.report_job_repo
            .mark_completed(
                job_id,
                stored.path.to_string_lossy().into_owned(),
                stored.url,
            )
            .await?;

        tracing::info!(
            job_id = %job_id,
            records = products.len(),
            file_name = %file_name,
            "report job completed"
        );

        Ok(())
    }
}

/// Render products as CSV: one header record plus one record per product.
fn render_csv(products: &[(product::Model, Option<category::Model>)]) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(REPORT_COLUMNS).map_err(csv_error)?;
    for (product, category) in products {
        writer
            .write_record(report_row(product, category.as_ref()))
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Storage(format!("Failed to render CSV report: {e}")))
}

/// Render products as a single-sheet XLSX workbook.
fn render_xlsx(products: &[(product::Model, Option<category::Model>)]) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(REPORT_SHEET_NAME).map_err(xlsx_error)?;

    for (col, header) in REPORT_COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *header)
            .map_err(xlsx_error)?;
    }

    for (i, (product, category)) in products.iter().enumerate() {
        let row_number = (i + 1) as u32;
        for (col, value) in report_row(product, category.as_ref()).iter().enumerate() {
            worksheet
                .write_string(row_number, col as u16, value)
                .map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// One output row in the shared column layout.
fn report_row(product: &product::Model, category: Option<&category::Model>) -> [String; 9] {
    [
        product.id.clone(),
        product.unique_id.clone(),
        product.name.clone(),
        format!("{:.2}", product.price),
        product.category_id.clone(),
        category.map(|c| c.name.clone()).unwrap_or_default(),
        product.image.clone().unwrap_or_default(),
        product.created_at.to_rfc3339(),
        product.updated_at.to_rfc3339(),
    ]
}

fn report_file_name(job_id: &str, format: ReportFormat) -> String {
    format!("products-report-{job_id}.{}", format_extension(format))
}

const fn format_extension(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Csv => "csv",
        ReportFormat::Xlsx => "xlsx",
    }
}

const fn content_type(format: ReportFormat) -> &'static str {
    match format {
        ReportFormat::Csv => "text/csv",
        ReportFormat::Xlsx => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
    }
}

/// Storage key of a report file, derived from its persisted path.
fn storage_key(file_path: &str) -> String {
    let name = Path::new(file_path).file_name().map_or_else(
        || file_path.to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    format!("reports/{name}")
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Storage(format!("Failed to render CSV report: {e}"))
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> AppError {
    AppError::Storage(format!("Failed to render XLSX report: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use calamine::{Reader, open_workbook_auto};
    use catalog_common::LocalStorage;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_product(id: &str, name: &str, price: f64) -> product::Model {
        product::Model {
            id: id.to_string(),
            name: name.to_string(),
            image: None,
            price,
            unique_id: format!("uid-{id}"),
            category_id: "cat1".to_string(),
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    fn create_test_category(id: &str, name: &str) -> category::Model {
        category::Model {
            id: id.to_string(),
            name: name.to_string(),
            unique_id: format!("uid-{id}"),
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
        }
    }

    fn create_test_job(id: &str, status: JobStatus) -> report_job::Model {
        report_job::Model {
            id: id.to_string(),
            format: ReportFormat::Csv,
            status,
            filters: serde_json::json!({}),
            file_path: None,
            download_url: None,
            total_records: 0,
            error_message: None,
            expires_at: Some(Utc::now().fixed_offset() + Duration::hours(1)),
            created_at: Utc::now().fixed_offset(),
            updated_at: Utc::now().fixed_offset(),
            completed_at: None,
        }
    }

    fn create_test_service(
        db: Arc<sea_orm::DatabaseConnection>,
        storage_root: &Path,
    ) -> ReportService {
        ReportService::new(
            ReportJobRepository::new(db.clone()),
            ProductRepository::new(db),
            Arc::new(LocalStorage::new(
                storage_root.to_path_buf(),
                "/uploads".to_string(),
            )),
        )
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_category_id() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = create_test_service(db, dir.path());

        let input = GenerateReportInput {
            category_id: Some("not-a-uuid".to_string()),
            ..GenerateReportInput::default()
        };
        let err = service.generate(input).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Invalid category ID");
    }

    #[tokio::test]
    async fn test_generate_rejects_negative_price_bound() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = create_test_service(db, dir.path());

        let input = GenerateReportInput {
            min_price: Some(-5.0),
            ..GenerateReportInput::default()
        };
        let err = service.generate(input).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_render_csv_layout() {
        let products = vec![
            (
                create_test_product("p1", "Widget", 9.99),
                Some(create_test_category("cat1", "Electronics")),
            ),
            (create_test_product("p2", "Gadget", 5.0), None),
        ];

        let bytes = render_csv(&products).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Product ID,Unique ID,Product Name,Price,Category ID,Category Name,Image,Created At,Updated At"
        );
        assert!(lines[1].starts_with("p1,uid-p1,Widget,9.99,cat1,Electronics,"));
        // Missing category and image render as empty cells.
        assert!(lines[2].starts_with("p2,uid-p2,Gadget,5.00,cat1,,"));
    }

    #[test]
    fn test_render_csv_empty_result_keeps_header() {
        let bytes = render_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Product ID,"));
    }

    #[test]
    fn test_render_xlsx_sheet_name_and_rows() {
        let products = vec![
            (
                create_test_product("p1", "Widget", 9.99),
                Some(create_test_category("cat1", "Electronics")),
            ),
            (create_test_product("p2", "Gadget", 5.0), None),
        ];

        let bytes = render_xlsx(&products).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(&path, bytes).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Products".to_string()]);

        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.height(), 3);
        assert_eq!(range.width(), 9);
        assert_eq!(
            range.get_value((0, 2)).map(ToString::to_string),
            Some("Product Name".to_string())
        );
        assert_eq!(
            range.get_value((1, 2)).map(ToString::to_string),
            Some("Widget".to_string())
        );
    }

    #[tokio::test]
    async fn test_download_rejects_unfinished_job() {
        let job = create_test_job("job1", JobStatus::Processing);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job]])
                .into_connection(),
        );
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(db, dir.path());

        let err = service.download("job1").await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "Report is not ready yet");
    }

    #[tokio::test]
    async fn test_download_rejects_missing_file() {
        let mut job = create_test_job("job1", JobStatus::Completed);
        job.file_path = Some("/nonexistent/products-report-job1.csv".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job]])
                .into_connection(),
        );
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(db, dir.path());

        let err = service.download("job1").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Report file not found");
    }

    #[tokio::test]
    async fn test_download_enforces_expiry_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("products-report-job1.csv");
        std::fs::write(&file_path, "Product ID\n").unwrap();

        let mut job = create_test_job("job1", JobStatus::Completed);
        job.file_path = Some(file_path.to_string_lossy().into_owned());
        job.expires_at = Some(Utc::now().fixed_offset() - Duration::hours(1));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job]])
                .into_connection(),
        );
        let service = create_test_service(db, dir.path());

        let err = service.download("job1").await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "Report has expired");
    }

    #[tokio::test]
    async fn test_download_serves_unexpired_report() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("products-report-job1.csv");
        std::fs::write(&file_path, "Product ID\n").unwrap();

        let mut job = create_test_job("job1", JobStatus::Completed);
        job.file_path = Some(file_path.to_string_lossy().into_owned());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job]])
                .into_connection(),
        );
        let service = create_test_service(db, dir.path());

        let download = service.download("job1").await.unwrap();

        assert_eq!(download.file_name, "products-report-job1.csv");
        assert_eq!(download.content_type, "text/csv");
        assert!(download.path.exists());
    }

    #[tokio::test]
    async fn test_download_unknown_job_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report_job::Model>::new()])
                .into_connection(),
        );
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(db, dir.path());

        let err = service.download("missing").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.to_string(), "Report job with ID missing not found");
    }

    #[tokio::test]
    async fn test_cleanup_expired_deletes_file_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let reports_dir = dir.path().join("reports");
        std::fs::create_dir_all(&reports_dir).unwrap();
        let file_path = reports_dir.join("products-report-job1.csv");
        std::fs::write(&file_path, "Product ID\n").unwrap();

        let mut job = create_test_job("job1", JobStatus::Completed);
        job.file_path = Some(file_path.to_string_lossy().into_owned());
        job.expires_at = Some(Utc::now().fixed_offset() - Duration::hours(2));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[job]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = create_test_service(db, dir.path());

        let deleted = service.cleanup_expired().await.unwrap();

        assert_eq!(deleted, 1);
        assert!(!file_path.exists());
    }

    #[test]
    fn test_filters_snapshot_omits_absent_fields() {
        let filters = ReportFilters {
            min_price: Some(10.0),
            max_price: Some(20.0),
            ..ReportFilters::default()
        };

        let json = serde_json::to_value(&filters).unwrap();

        assert_eq!(json["min_price"], 10.0);
        assert!(json.get("category_id").is_none());
        assert!(json.get("start_date").is_none());
    }

    #[test]
    fn test_report_file_name_carries_format_extension() {
        assert_eq!(
            report_file_name("job1", ReportFormat::Csv),
            "products-report-job1.csv"
        );
        assert_eq!(
            report_file_name("job1", ReportFormat::Xlsx),
            "products-report-job1.xlsx"
        );
    }

    #[test]
    fn test_storage_key_from_persisted_path() {
        assert_eq!(
            storage_key("/var/data/reports/products-report-job1.csv"),
            "reports/products-report-job1.csv"
        );
    }
}
