//! Integration tests for the health endpoint and general routing.

mod common;

use axum::http::StatusCode;
use sqlx::PgPool;

use common::{body_json, request_anonymous, MockUpstream};

#[sqlx::test(migrations = "../../migrations")]
async fn healthz_answers_ok_when_database_is_up(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, MockUpstream::healthy(), tmp.path().to_path_buf());

    let response = request_anonymous(app, "GET", "/healthz").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["database"], "ok");
}

#[sqlx::test(migrations = "../../migrations")]
async fn healthz_needs_no_identity_headers(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, MockUpstream::healthy(), tmp.path().to_path_buf());

    let response = request_anonymous(app, "GET", "/healthz").await;
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_route_answers_404(pool: PgPool) {
    let tmp = tempfile::tempdir().unwrap();
    let app = common::build_test_app(pool, MockUpstream::healthy(), tmp.path().to_path_buf());

    let response = request_anonymous(app, "GET", "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
