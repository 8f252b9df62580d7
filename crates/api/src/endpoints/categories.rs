//! Category endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use catalog_common::{AppResult, Paginated, Pagination};
use catalog_core::{CreateCategoryInput, UpdateCategoryInput};
use catalog_db::entities::category;
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: String,
}

/// Create a category.
async fn create(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.category_service.create(input).await?;
    Ok(ApiResponse::created(category))
}

/// List categories, newest first.
async fn list(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<ApiResponse<Paginated<category::Model>>> {
    let page = state.category_service.list(pagination).await?;
    Ok(ApiResponse::ok(page))
}

/// Search categories by name fragment.
async fn search(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Query(pagination): Query<Pagination>,
) -> AppResult<ApiResponse<Paginated<category::Model>>> {
    let page = state.category_service.search(&query.q, pagination).await?;
    Ok(ApiResponse::ok(page))
}

/// List every category without pagination, ordered by name.
async fn list_all(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<category::Model>>> {
    let categories = state.category_service.list_all().await?;
    Ok(ApiResponse::ok(categories))
}

/// Get one category by id.
async fn show(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.category_service.get(&id).await?;
    Ok(ApiResponse::ok(category))
}

/// Get one category by its secondary unique id.
async fn show_by_unique_id(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.category_service.get_by_unique_id(&unique_id).await?;
    Ok(ApiResponse::ok(category))
}

/// Update a category.
async fn update(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.category_service.update(&id, input).await?;
    Ok(ApiResponse::ok(category))
}

/// Delete a category.
async fn delete(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state.category_service.delete(&id).await?;
    Ok(ApiResponse::ok(MessageResponse::new(message)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/all/list", get(list_all))
        .route("/unique/{unique_id}", get(show_by_unique_id))
        .route("/{id}", get(show).patch(update).delete(delete))
}
