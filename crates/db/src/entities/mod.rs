//! Database entities.

#![allow(missing_docs)]

pub mod category;
pub mod job_status;
pub mod product;
pub mod report_job;
pub mod upload_job;
pub mod user;

pub use category::Entity as Category;
pub use job_status::JobStatus;
pub use product::Entity as Product;
pub use report_job::Entity as ReportJob;
pub use report_job::ReportFormat;
pub use upload_job::Entity as UploadJob;
pub use user::Entity as User;
