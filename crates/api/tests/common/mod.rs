//! Shared helpers for API integration tests: a scripted upstream client,
//! router construction mirroring `main.rs`, and request plumbing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use claimstream_api::config::ServerConfig;
use claimstream_api::routes;
use claimstream_api::state::AppState;
use claimstream_core::resource::{ChunkLimits, ResourceType};
use claimstream_core::types::{DbId, Timestamp};
use claimstream_upstream::{DataServerClient, UpstreamError};

/// Scripted stand-in for the FHIR data server.
pub struct MockUpstream {
    /// When set, `fetch_metadata` fails (admission must fail the job).
    pub fail_metadata: bool,
}

impl MockUpstream {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self {
            fail_metadata: false,
        })
    }
}

#[async_trait]
impl DataServerClient for MockUpstream {
    async fn fetch_record(
        &self,
        resource_type: ResourceType,
        beneficiary_id: &str,
        _job_id: DbId,
        _org_id: Uuid,
        _since: Option<&str>,
    ) -> Result<String, UpstreamError> {
        Ok(format!(
            r#"{{"resourceType":"{resource_type}","id":"{beneficiary_id}"}}"#
        ))
    }

    async fn fetch_metadata(&self) -> Result<Timestamp, UpstreamError> {
        if self.fail_metadata {
            return Err(UpstreamError::Status { code: 503 });
        }
        Ok(chrono::Utc::now())
    }
}

/// Build a test `ServerConfig` with safe defaults and the given payload
/// directory.
pub fn test_config(payload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "http://localhost:3000".to_string(),
        payload_dir: payload_dir.to_path_buf(),
        visibility_window: chrono::Duration::hours(24),
        retry_after_secs: 30,
        chunk_limits: ChunkLimits::default(),
    }
}

/// Build the application router with the full route table, using the given
/// pool and upstream client.
pub fn build_test_app(
    pool: PgPool,
    upstream: Arc<dyn DataServerClient>,
    payload_dir: PathBuf,
) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(test_config(&payload_dir)),
        upstream,
    };

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .nest("/data", routes::data_routes())
        .with_state(state)
}

/// One identity for the duration of a test.
#[derive(Clone, Copy)]
pub struct TestOrg {
    pub org_id: Uuid,
    pub user_id: Uuid,
}

impl TestOrg {
    pub fn new() -> Self {
        Self {
            org_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }
}

/// Issue a request with the identity headers set.
pub async fn request_as(
    app: Router,
    org: TestOrg,
    method: &str,
    path: &str,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header("x-org-id", org.org_id.to_string())
            .header("x-user-id", org.user_id.to_string())
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a request with no identity headers.
pub async fn request_anonymous(app: Router, method: &str, path: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Import a one-file roster for the organization.
pub async fn seed_roster(pool: &PgPool, org_id: Uuid, benes: &[&str]) {
    let file_id: i64 = sqlx::query_scalar(
        "INSERT INTO roster_files (org_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(org_id)
    .bind(format!("roster-{org_id}.csv"))
    .fetch_one(pool)
    .await
    .unwrap();

    for bene in benes {
        sqlx::query("INSERT INTO roster_beneficiaries (file_id, beneficiary_id) VALUES ($1, $2)")
            .bind(file_id)
            .bind(bene)
            .execute(pool)
            .await
            .unwrap();
    }
}

/// Assert a response status, dumping the body on mismatch.
pub async fn assert_status(response: Response<Body>, expected: StatusCode) -> Response<Body> {
    let status = response.status();
    if status == expected {
        return response;
    }
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    panic!(
        "expected {expected}, got {status}: {}",
        String::from_utf8_lossy(&bytes),
    );
}
