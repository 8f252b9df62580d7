//! Bulk upload endpoints.

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    routing::{delete, get, post},
};
use catalog_common::{AppError, AppResult};
use catalog_core::{UploadJobView, UploadSubmission};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Content types accepted for the uploaded file part.
const ALLOWED_CONTENT_TYPES: [&str; 3] = [
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// Accept a tabular file and start a detached import job.
async fn upload(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<UploadSubmission>> {
    let mut file_name: Option<String> = None;
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        if let Some(content_type) = field.content_type()
            && !ALLOWED_CONTENT_TYPES.contains(&content_type)
        {
            return Err(AppError::BadRequest(
                "Only CSV and XLSX files are allowed".to_string(),
            ));
        }

        file_name = field.file_name().map(std::string::ToString::to_string);
        file_data = Some(
            field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?
                .to_vec(),
        );
    }

    let data = file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let file_name = file_name.unwrap_or_default();

    let submission = state.bulk_upload_service.submit(&file_name, &data).await?;
    Ok(ApiResponse::accepted(submission))
}

/// Poll one import job.
async fn status(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<ApiResponse<UploadJobView>> {
    let job = state.bulk_upload_service.status(&job_id).await?;
    Ok(ApiResponse::ok(job))
}

/// List recent import jobs, newest first.
async fn jobs(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<UploadJobView>>> {
    let jobs = state.bulk_upload_service.list_jobs().await?;
    Ok(ApiResponse::ok(jobs))
}

/// Cleanup query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CleanupQuery {
    /// Minimum age in days of finished jobs to delete.
    days: Option<i64>,
}

/// Cleanup result payload.
#[derive(Serialize)]
struct CleanupResponse {
    deleted: u64,
}

/// Delete finished jobs older than the given age.
async fn cleanup(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> AppResult<ApiResponse<CleanupResponse>> {
    let deleted = state.bulk_upload_service.cleanup(query.days).await?;
    Ok(ApiResponse::ok(CleanupResponse { deleted }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload))
        .route("/status/{job_id}", get(status))
        .route("/jobs", get(jobs))
        .route("/cleanup", delete(cleanup))
}
