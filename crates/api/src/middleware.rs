//! API middleware.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use catalog_common::StorageBackend;
use catalog_core::{
    AuthService, BulkUploadService, CategoryService, ProductService, ReportService, UserService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub category_service: CategoryService,
    pub product_service: ProductService,
    pub bulk_upload_service: BulkUploadService,
    pub report_service: ReportService,
    /// Backend for product image uploads; job files go through the services.
    pub storage: Arc<dyn StorageBackend>,
}

/// Authentication middleware.
///
/// Verifies the bearer token and stores the matching user in request
/// extensions; routes decide via the `AuthUser` extractor whether a missing
/// user is fatal. Requests without a valid token pass through untouched.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(claims) = state.auth_service.verify_token(token)
        && let Ok(Some(user)) = state.user_service.find_by_email(&claims.email).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
