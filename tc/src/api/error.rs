//! Backend API error types

use thiserror::Error;

/// Errors that can occur while talking to the task backend
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Access token not found. Set the {0} environment variable.")]
    MissingToken(String),
}

impl ApiError {
    /// Check if the backend rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::Api { status: 401, .. })
    }

    /// Check if this error is retryable
    ///
    /// Only idempotent requests are ever retried; the caller decides that.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Api { status, .. } => is_retryable_status(*status),
            ApiError::Network(_) => true,
            ApiError::Unauthorized(_) => false,
            ApiError::InvalidResponse(_) => false,
            ApiError::Json(_) => false,
            ApiError::MissingToken(_) => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Check if an HTTP status code is worth another attempt
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Pull a human readable message out of an error body
///
/// The backend answers failures with `{"error": "..."}` or `{"detail": "..."}`;
/// anything else is passed through as text.
pub(crate) fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "detail", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    trimmed.to_string()
}
