//! Router-level checks that need no database.
//!
//! The pool connects lazily to an unreachable address, so anything that
//! reaches `PostgreSQL` fails; authentication is rejected before that.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use deskops_integration_tests::server_config;
use deskops_server::middleware::create_session_layer;
use deskops_server::state::AppState;

fn test_app() -> Router {
    let config = server_config();
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(config.database_url.expose_secret())
        .unwrap();
    let session_layer = create_session_layer(&pool, &config).unwrap();
    let state = AppState::new(config, pool).unwrap();
    deskops_server::app(state, session_layer)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = test_app()
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_protected_routes_require_login() {
    let routes = [
        ("GET", "/api/auth/me"),
        ("GET", "/api/tickets"),
        ("POST", "/api/tickets"),
        ("GET", "/api/dashboard"),
        ("GET", "/api/agenda"),
        ("GET", "/api/events"),
        ("GET", "/api/users"),
        ("GET", "/api/admin-logs"),
        ("GET", "/api/wordpress/users"),
        ("POST", "/api/wordpress/enroll"),
        ("GET", "/api/google/users"),
    ];

    for (method, uri) in routes {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require a session"
        );
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Authentication required" })
        );
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let response = test_app()
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

