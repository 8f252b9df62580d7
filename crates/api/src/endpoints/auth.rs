//! Authentication endpoints.

use axum::{Json, Router, extract::State, routing::post};
use catalog_common::AppResult;
use catalog_core::{AuthResponse, CreateUserInput, LoginInput};

use crate::{middleware::AppState, response::ApiResponse};

/// Register a new account and issue its first token.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let response = state.auth_service.register(input).await?;
    Ok(ApiResponse::created(response))
}

/// Exchange credentials for an access token.
async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let response = state.auth_service.login(input).await?;
    Ok(ApiResponse::ok(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
