use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use claimstream_core::error::CoreError;
use claimstream_core::types::Timestamp;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `claimstream_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed identity headers.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job's output has left the visibility window.
    #[error("Gone: {message}")]
    Gone {
        message: String,
        /// When the output expired (or will), surfaced as an `Expires`
        /// header.
        expires: Option<Timestamp>,
    },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Throttle responses carry a Retry-After header alongside the JSON
        // body, so they are assembled separately.
        if let AppError::Core(CoreError::Throttled { retry_after_secs }) = &self {
            let body = json!({
                "error": self.to_string(),
                "code": "THROTTLED",
            });
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after_secs.to_string())],
                axum::Json(body),
            )
                .into_response();
        }

        if let AppError::Gone { message, expires } = &self {
            let body = json!({
                "error": message,
                "code": "GONE",
            });
            let mut response = (StatusCode::GONE, axum::Json(body)).into_response();
            if let Some(expires) = expires {
                if let Ok(value) = expires.to_rfc2822().parse() {
                    response.headers_mut().insert("Expires", value);
                }
            }
            return response;
        }

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::RosterMissing { org_id } => (
                    StatusCode::NOT_FOUND,
                    "ROSTER_MISSING",
                    format!("no roster has been imported for organization {org_id}"),
                ),
                CoreError::RosterEmpty { org_id } => {
                    tracing::error!(%org_id, "roster resolved to zero beneficiaries");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
                // Handled above.
                CoreError::Throttled { .. } => unreachable!(),
            },

            // --- Database errors ---
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Gone { .. } => unreachable!(),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
