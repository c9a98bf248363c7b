//! Router tests that run without a database.
//!
//! The state holds a disconnected pool, so anything reaching a repository
//! fails with a database error.

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use hisab_api::{AppState, create_router};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    create_router(
        AppState::new(DatabaseConnection::Disconnected),
        Duration::from_secs(5),
    )
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_reports_version() {
    let response = app().oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_readiness_fails_without_database() {
    let response = app().oneshot(get("/api/v1/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unavailable");
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let response = app().oneshot(get("/api/v1/health")).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_malformed_company_id_rejected_before_database() {
    let response = app()
        .oneshot(get("/api/v1/companies/not-a-uuid/accounts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_company_id");
}

#[tokio::test]
async fn test_database_failure_is_masked() {
    let uri = format!("/api/v1/companies/{}/sales", Uuid::new_v4());
    let response = app().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "database_error");
    assert_eq!(body["message"], "An error occurred");
}

#[tokio::test]
async fn test_incomplete_body_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/companies")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "Acme"}"#))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_body");
    assert!(body["message"].as_str().unwrap().contains("slug"));
}

#[tokio::test]
async fn test_broken_json_rejected_with_error_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/companies")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name": "#))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "malformed_json");
}

#[tokio::test]
async fn test_bad_path_parameter_rejected_with_error_body() {
    let response = app()
        .oneshot(get("/api/v1/companies/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_path");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let uri = format!("/api/v1/companies/{}/ledgers", Uuid::new_v4());
    let response = app().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
