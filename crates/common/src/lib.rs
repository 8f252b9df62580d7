//! Common utilities and shared types for catalog-rs.
//!
//! This crate provides foundational components used across all catalog-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: UUID-based unique identifiers via [`IdGenerator`]
//! - **Pagination**: Page/limit parameters and the list response envelope
//! - **Storage**: Local file storage for uploads and generated reports
//!
//! # Example
//!
//! ```no_run
//! use catalog_common::{AppResult, Config, IdGenerator};
//!
//! fn bootstrap() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let product_id = IdGenerator::new().generate();
//!     println!("serving on port {}, first id {product_id}", config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod pagination;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::{IdGenerator, is_v4_uuid};
pub use pagination::{PageMeta, Paginated, Pagination};
pub use storage::{LocalStorage, StorageBackend, StoredFile, generate_storage_key};
