//! Async client for the Smartsheet REST API.
//!
//! Every call goes through one shared [`Transport`], which retries the API's
//! transient error codes (4001-4004) with exponential backoff until the
//! configured `max_retry_timeout` is spent.

pub mod config;
pub mod error;
pub mod smartsheet;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{Result, SmartsheetError};
pub use smartsheet::{
    ApiError, ApiResult, HttpEntity, HttpRequest, HttpResponse, MultipartUpload, PageParams,
    PagedResult, RetryPolicy, SmartsheetClient, Transport,
};
