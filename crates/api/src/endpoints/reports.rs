//! Report endpoints.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use catalog_common::{AppError, AppResult};
use catalog_core::{GenerateReportInput, ReportJobView, ReportSubmission};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Start a detached report generation job.
async fn generate(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<GenerateReportInput>,
) -> AppResult<ApiResponse<ReportSubmission>> {
    let submission = state.report_service.generate(input).await?;
    Ok(ApiResponse::accepted(submission))
}

/// Poll one report job.
async fn status(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<ApiResponse<ReportJobView>> {
    let job = state.report_service.status(&job_id).await?;
    Ok(ApiResponse::ok(job))
}

/// List recent report jobs, newest first.
async fn jobs(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ReportJobView>>> {
    let jobs = state.report_service.list_jobs().await?;
    Ok(ApiResponse::ok(jobs))
}

/// Stream a finished report as a download attachment.
async fn download(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Response> {
    let download = state.report_service.download(&job_id).await?;

    let file = tokio::fs::File::open(&download.path)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to open report file: {e}")))?;
    let body = Body::from_stream(ReaderStream::new(file));

    let headers = [
        (header::CONTENT_TYPE, download.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.file_name),
        ),
    ];

    Ok((headers, body).into_response())
}

/// Cleanup result payload.
#[derive(Serialize)]
struct CleanupResponse {
    deleted: u64,
}

/// Delete expired reports and their files.
async fn cleanup(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<CleanupResponse>> {
    let deleted = state.report_service.cleanup_expired().await?;
    Ok(ApiResponse::ok(CleanupResponse { deleted }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/status/{job_id}", get(status))
        .route("/jobs", get(jobs))
        .route("/download/{job_id}", get(download))
        .route("/cleanup", delete(cleanup))
}
