//! Database repositories.

#![allow(missing_docs)]

pub mod category;
pub mod product;
pub mod report_job;
pub mod upload_job;
pub mod user;

pub use category::CategoryRepository;
pub use product::{NewProduct, ProductListQuery, ProductRepository, ReportFilterQuery};
pub use report_job::ReportJobRepository;
pub use upload_job::UploadJobRepository;
pub use user::UserRepository;
