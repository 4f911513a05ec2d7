use serde::{Deserialize, Serialize};
use std::fmt;

use super::retry::RETRYABLE_ERROR_CODES;

// ============= Error Models =============

/// Structured error body returned by the API on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error_code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ApiError {
    /// Wrap a body that is not a structured error (HTML error pages, plain text).
    pub fn unstructured(message: impl Into<String>) -> Self {
        Self {
            error_code: 0,
            message: message.into(),
            ref_id: None,
            detail: None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        RETRYABLE_ERROR_CODES.contains(&self.error_code)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ref_id {
            Some(ref_id) => write!(
                f,
                "[{}] {} (refId: {})",
                self.error_code, self.message, ref_id
            ),
            None => write!(f, "[{}] {}", self.error_code, self.message),
        }
    }
}

// ============= Envelope Models =============

pub const RESULT_CODE_SUCCESS: i32 = 0;
pub const RESULT_CODE_PARTIAL_SUCCESS: i32 = 3;

/// Envelope returned by create/update/delete endpoints.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult<T> {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result_code: i32,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub version: Option<i64>,
}

impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        self.result_code == RESULT_CODE_SUCCESS
    }

    pub fn is_partial_success(&self) -> bool {
        self.result_code == RESULT_CODE_PARTIAL_SUCCESS
    }
}

/// Envelope returned by list endpoints.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    #[serde(default)]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub total_pages: Option<i64>,
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> PagedResult<T> {
    pub fn has_more(&self) -> bool {
        match (self.page_number, self.total_pages) {
            (Some(page), Some(total)) => page < total,
            _ => false,
        }
    }
}

/// Paging query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub include_all: bool,
}

impl PageParams {
    pub fn all() -> Self {
        Self {
            include_all: true,
            ..Self::default()
        }
    }

    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            include_all: false,
        }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = vec![];

        // includeAll overrides paging on the server side
        if self.include_all {
            params.push(("includeAll".to_string(), "true".to_string()));
            return params;
        }
        if let Some(p) = self.page {
            params.push(("page".to_string(), p.to_string()));
        }
        if let Some(ps) = self.page_size {
            params.push(("pageSize".to_string(), ps.to_string()));
        }

        params
    }
}
