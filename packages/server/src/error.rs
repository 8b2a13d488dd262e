use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repository::RepositoryError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `DUPLICATE_CONTENT`, `NOT_FOUND`, `INTERNAL_ERROR`.
    #[schema(example = "DUPLICATE_CONTENT")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Imagem duplicada")]
    pub error: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Duplicate,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    error: msg,
                },
            ),
            AppError::Duplicate => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "DUPLICATE_CONTENT",
                    error: "Imagem duplicada".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    error: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        error: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InvalidInput(msg) => AppError::Validation(msg),
            RepositoryError::DuplicateContent(_) => AppError::Duplicate,
            RepositoryError::NotFound(what) => {
                tracing::warn!("Not found: {what}");
                AppError::NotFound("Imagem não encontrada".into())
            }
            RepositoryError::StorageFailure(detail) => AppError::Internal(detail),
        }
    }
}
