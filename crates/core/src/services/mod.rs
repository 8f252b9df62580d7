//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod bulk_upload;
pub mod category;
pub mod product;
pub mod report;
pub mod tabular;
pub mod user;

pub use auth::{AuthResponse, AuthService, Claims, LoginInput};
pub use bulk_upload::{BulkUploadService, UploadJobView, UploadSubmission};
pub use category::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
pub use product::{
    CreateProductInput, ListProductsQuery, ProductService, ProductView, UpdateProductInput,
};
pub use report::{
    GenerateReportInput, ReportDownload, ReportFilters, ReportJobView, ReportService,
    ReportSubmission,
};
pub use tabular::{RawRow, parse_rows};
pub use user::{CreateUserInput, UpdateUserInput, UserService, UserView};
