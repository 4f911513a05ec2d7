pub mod client;
pub mod models;
pub mod retry;
pub mod transport;

pub use client::SmartsheetClient;
pub use models::{ApiError, ApiResult, PageParams, PagedResult};
pub use retry::{RetryPolicy, RetryState};
pub use transport::{HttpEntity, HttpRequest, HttpResponse, MultipartUpload, Transport};
