use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::BucketgateError;

/// Request-level failures, rendered as `{"error": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No `X-API-Key` header on the request.
    #[error("missing X-API-Key")]
    MissingApiKey,
    /// The presented key was never issued or has been revoked.
    #[error("invalid api key")]
    InvalidApiKey,
    /// The caller's bucket is empty.
    #[error("rate limit exceeded")]
    RateLimited,
    /// Status requested before the caller's first limited request.
    #[error("rate limit bucket not initialized yet")]
    BucketNotInitialized,
    /// Revocation of an unknown key.
    #[error("key not found")]
    KeyNotFound,
    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingApiKey | Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BucketNotInitialized | Self::KeyNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BucketgateError> for ApiError {
    fn from(err: BucketgateError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(message) = &self {
            tracing::error!(error = %message, "request failed");
        }

        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
