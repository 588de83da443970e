//! Error types for pitchbox-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use pitchbox_model::ModelError;

/// API error type
///
/// Client-attributable failures (bad parameters, empty uploads, undecodable
/// audio) map to 400; model faults and internal failures map to 500. Every
/// response carries a machine-readable code and a human-readable reason;
/// stack traces and internal paths stay out of responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A query parameter failed to parse or violated its range (400)
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    /// The uploaded file part had zero bytes (400)
    #[error("empty upload: {0}")]
    EmptyUpload(String),

    /// Malformed request: missing file part or filename (400)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The uploaded audio could not be decoded (400)
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The model failed during feature extraction or inference (500)
    #[error("inference failed: {0}")]
    ModelInference(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedFormat(msg) => ApiError::UnsupportedFormat(msg),
            ModelError::Inference(msg) => ApiError::ModelInference(msg),
            ModelError::Io(e) => ApiError::Io(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidParameter { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_PARAMETER", self.to_string())
            }
            ApiError::EmptyUpload(msg) => (StatusCode::BAD_REQUEST, "EMPTY_UPLOAD", msg),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg),
            ApiError::UnsupportedFormat(msg) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT", msg)
            }
            ApiError::ModelInference(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "MODEL_INFERENCE", msg)
            }
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
