//! Liveness/readiness handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// GET /healthz
///
/// Answers 200 when the database responds, 503 otherwise.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match claimstream_db::health_check(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "database": "ok" }))),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "database": "unavailable" })),
            )
        }
    }
}
