use std::sync::Arc;

use claimstream_upstream::DataServerClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: claimstream_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Upstream clinical-data server client.
    pub upstream: Arc<dyn DataServerClient>,
}
