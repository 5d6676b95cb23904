use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repository::RepositoryError;

/// AppError
///
/// Every failure a handler or extractor can report. Each variant maps to one
/// HTTP status; `Unsupported` is answered in plain text, the rest as JSON.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("You are not authenticated!")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unsupported(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// ErrorBody
///
/// JSON envelope for error responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
}

impl AppError {
    pub fn blog_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("Blog {id} not found"))
    }

    pub fn comment_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("Comment {id} not found"))
    }

    pub fn not_comment_author() -> Self {
        AppError::Forbidden("Not the correct author of this comment".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) | AppError::Unsupported(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DuplicateTitle(title) => {
                AppError::Conflict(format!("A blog titled \"{title}\" already exists"))
            }
            other => AppError::Repository(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            AppError::Unsupported(message) => (status, message).into_response(),
            AppError::Repository(e) => {
                tracing::error!("repository error: {:?}", e);
                let body = ErrorBody {
                    status: status.as_u16(),
                    message: "Internal server error".to_string(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                let body = ErrorBody {
                    status: status.as_u16(),
                    message: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
