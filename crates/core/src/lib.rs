//! Core business logic for catalog-rs.

pub mod services;

pub use services::*;
