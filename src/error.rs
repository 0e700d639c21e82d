use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::repository::StoreError;

/// AppError
///
/// The HTTP-facing error taxonomy. Every lower layer (store, credentials, tokens, guards)
/// converts into one of these variants; handlers never expose raw store errors beyond
/// the diagnostic message carried here.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Unique-constraint violation.
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    /// Missing, invalid or expired token, or a token whose subject no longer exists.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid token, insufficient role or ownership.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Duplicate(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => {
                AppError::Duplicate(format!("A record with this {field} already exists."))
            }
            StoreError::Backend(message) => {
                tracing::error!(%message, "store operation failed");
                AppError::Internal(format!("Internal server error: {message}"))
            }
        }
    }
}
