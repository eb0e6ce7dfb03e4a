use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentinelApiError {
    #[error("Failed to create HTTP client: {0}")]
    HttpClientCreationError(reqwest::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Sentinel API error ({status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    #[error("Hunting query with ID '{0}' not found")]
    QueryNotFound(String),

    #[error("Hunt with ID '{0}' not found")]
    HuntNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Pagination error: {0}")]
    PaginationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource '{0}' was not created by this integration")]
    NotOwned(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SentinelApiError {
    /// Builds an `ApiError` from a non-success response body.
    ///
    /// ARM wraps failures as `{"error": {"code": .., "message": ..}}`; when the
    /// body is not JSON the raw text becomes the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let payload = serde_json::from_str::<Value>(body).ok();
        let message = payload
            .as_ref()
            .and_then(|p| {
                p.pointer("/error/message")
                    .or_else(|| p.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                }
            });

        SentinelApiError::ApiError {
            status,
            message,
            payload,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SentinelApiError::ApiError { status, .. } => Some(*status),
            SentinelApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
