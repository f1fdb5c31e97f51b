//! Route table assembly.

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{data, export, status};
use crate::state::AppState;

/// Routes mounted at `/api/v1`.
///
/// ```text
/// POST   /export       -> start_export
/// GET    /jobs/{id}    -> job_status
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/export", post(export::start_export))
        .route("/jobs/{id}", get(status::job_status))
}

/// Routes mounted at `/data`.
///
/// ```text
/// GET    /{job_id}/{file}   -> download
/// ```
pub fn data_routes() -> Router<AppState> {
    Router::new().route("/{job_id}/{file}", get(data::download))
}
