//! API endpoints.

mod auth;
mod bulk_upload;
mod categories;
mod health;
mod products;
mod reports;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/bulk-upload", bulk_upload::router())
        .nest("/reports", reports::router())
        .merge(health::router())
}
