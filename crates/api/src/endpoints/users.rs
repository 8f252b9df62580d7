//! User management endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use catalog_common::{AppResult, Paginated, Pagination};
use catalog_core::{CreateUserInput, UpdateUserInput, UserView};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Create a user.
async fn create(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<ApiResponse<UserView>> {
    let user = state.user_service.create(input).await?;
    Ok(ApiResponse::created(user.into()))
}

/// List users, newest first.
async fn list(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<ApiResponse<Paginated<UserView>>> {
    let page = state.user_service.list(pagination).await?;
    Ok(ApiResponse::ok(page))
}

/// Get one user by id.
async fn show(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserView>> {
    let user = state.user_service.get(&id).await?;
    Ok(ApiResponse::ok(user))
}

/// Update a user.
async fn update(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<ApiResponse<UserView>> {
    let user = state.user_service.update(&id, input).await?;
    Ok(ApiResponse::ok(user))
}

/// Delete a user.
async fn delete(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state.user_service.delete(&id).await?;
    Ok(ApiResponse::ok(MessageResponse::new(message)))
}

/// Count all users.
async fn count(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<u64>> {
    let total = state.user_service.count().await?;
    Ok(ApiResponse::ok(total))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/count/total", get(count))
        .route("/{id}", get(show).patch(update).delete(delete))
}
