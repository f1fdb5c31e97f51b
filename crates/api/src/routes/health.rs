//! Health route, mounted at the root rather than under `/api/v1` so load
//! balancers can reach it unauthenticated.

use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(health::healthz))
}
