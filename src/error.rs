use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::models::FieldErrors;

/// ApiError
///
/// The application's error taxonomy, bridged to HTTP responses through
/// `IntoResponse`. Handlers return `Result<_, ApiError>` and propagate with
/// `?`; the conversion point is the only place response codes are decided,
/// so a given failure always maps to the same status everywhere.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed creation input. Carries the complete field → message map so
    /// the client can render every problem at once.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// A status value outside the assignable moderation targets.
    #[error("invalid status value")]
    InvalidStatus,

    /// Missing or invalid identity token.
    #[error("authentication required")]
    Authentication,

    /// Authenticated but lacking the role or ownership the action needs.
    /// Deliberately carries no resource detail.
    #[error("not authorized")]
    Authorization,

    /// The referenced record does not exist.
    #[error("not found")]
    NotFound,

    /// Underlying store failure. Logged with full context at the response
    /// boundary; the client only ever sees a generic message.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Object storage failure while issuing an upload URL.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Generic JSON error body. Validation failures use [`ValidationBody`]
/// instead so the field map reaches the client intact.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ValidationBody {
    errors: FieldErrors,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(ValidationBody { errors })).into_response()
            }
            ApiError::InvalidStatus => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    message: "status must be APPROVED or REJECTED".to_string(),
                }),
            )
                .into_response(),
            ApiError::Authentication => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    message: "authentication required".to_string(),
                }),
            )
                .into_response(),
            ApiError::Authorization => (
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    message: "not authorized".to_string(),
                }),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    message: "not found".to_string(),
                }),
            )
                .into_response(),
            ApiError::Database(source) => {
                // Full context stays server-side.
                tracing::error!(error = ?source, "database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        message: "internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
            ApiError::Storage(source) => {
                tracing::error!(error = %source, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        message: "internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
