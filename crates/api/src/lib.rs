//! HTTP API layer for catalog-rs.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: auth, users, categories, products, bulk upload, reports
//! - **Extractors**: the authenticated user injected by the middleware
//! - **Middleware**: bearer-token authentication and application state
//! - **Response**: the `{data: ...}` success envelope
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
