use thiserror::Error;

use crate::smartsheet::models::ApiError;

#[derive(Error, Debug)]
pub enum SmartsheetError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authorization failed (HTTP {status}): {error}")]
    Authorization { status: u16, error: ApiError },

    #[error("Resource not found (HTTP {status}): {error}")]
    ResourceNotFound { status: u16, error: ApiError },

    #[error("Invalid request (HTTP {status}): {error}")]
    InvalidRequest { status: u16, error: ApiError },

    #[error("Service unavailable (HTTP {status}): {error}")]
    ServiceUnavailable { status: u16, error: ApiError },

    #[error("API request failed (HTTP {status}): {error}")]
    Service { status: u16, error: ApiError },

    #[error("Unreadable error body (HTTP {status}): {source}")]
    MalformedErrorBody {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SmartsheetError {
    /// Classify a final failing response by its HTTP status.
    pub fn from_status(status: u16, error: ApiError) -> Self {
        match status {
            400 | 405 | 415 => Self::InvalidRequest { status, error },
            401 | 403 => Self::Authorization { status, error },
            404 => Self::ResourceNotFound { status, error },
            429 | 503 => Self::ServiceUnavailable { status, error },
            _ => Self::Service { status, error },
        }
    }

    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authorization { status, .. }
            | Self::ResourceNotFound { status, .. }
            | Self::InvalidRequest { status, .. }
            | Self::ServiceUnavailable { status, .. }
            | Self::Service { status, .. }
            | Self::MalformedErrorBody { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Authorization { error, .. }
            | Self::ResourceNotFound { error, .. }
            | Self::InvalidRequest { error, .. }
            | Self::ServiceUnavailable { error, .. }
            | Self::Service { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<i32> {
        self.api_error().map(|e| e.error_code)
    }
}

pub type Result<T> = std::result::Result<T, SmartsheetError>;
