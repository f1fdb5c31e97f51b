//! Caller identity extractor for Axum handlers.
//!
//! The engine sits behind a fronting auth layer that authenticates the
//! caller and injects `X-Org-Id` / `X-User-Id` headers; identity is never
//! re-derived here. Requests without both headers are rejected.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller extracted from the identity headers.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(auth: AuthOrg) -> AppResult<Json<()>> {
///     tracing::info!(org_id = %auth.org_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthOrg {
    /// The calling organization.
    pub org_id: Uuid,
    /// The individual user within the organization.
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthOrg {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(AuthOrg {
            org_id: header_uuid(parts, "x-org-id")?,
            user_id: header_uuid(parts, "x-user-id")?,
        })
    }
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    let value = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {name} header")))?;

    value
        .parse()
        .map_err(|_| AppError::Unauthorized(format!("Invalid {name} header")))
}
