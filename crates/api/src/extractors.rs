//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use catalog_common::AppError;
use catalog_db::entities::user;

/// Authenticated user extractor.
///
/// Pulls the user the auth middleware stored in request extensions; absent
/// means the request never carried a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
    }
}
