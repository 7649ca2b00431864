//! Request admission through the full router.
//!
//! Each test builds a fresh in-memory store and varies the user agent, so
//! anonymous callers never share a fingerprint across tests.

use accuread_api::config::{CountingMode, Settings};
use accuread_api::routes::{AppState, create_app, create_in_memory_app_state};
use accuread_api::services::jwt_service::JwtService;
use accuread_api::storage::{CounterStore, KeyTtl, StoreError};
use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, ORIGIN, USER_AGENT};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestResponse, TestServer};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

fn settings(mode: CountingMode) -> Settings {
    Settings {
        counting_mode: mode,
        ..Settings::default()
    }
}

fn server_for(state: AppState) -> TestServer {
    TestServer::new(create_app(state, &[])).unwrap()
}

fn memory_server(mode: CountingMode) -> TestServer {
    server_for(create_in_memory_app_state(
        &settings(mode),
        JwtService::new(SECRET),
    ))
}

/// A token nobody verifies on the admission path; only the subject matters.
fn unsigned_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"not-the-server-secret"),
    )
    .unwrap()
}

fn as_client(request: TestRequest, user_agent: &str, token: Option<&str>) -> TestRequest {
    let request = request.add_header(USER_AGENT, HeaderValue::from_str(user_agent).unwrap());
    match token {
        Some(token) => request.add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        ),
        None => request,
    }
}

fn header(response: &TestResponse, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn bad_login() -> Value {
    json!({"username": "user", "password": "wrong"})
}

#[tokio::test]
async fn test_auth_tier_allows_five_then_rejects() {
    let server = memory_server(CountingMode::Lenient);
    let token = unsigned_token(json!({"sub": "42"}));

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = as_client(server.post("/api/v1/auth/login"), "auth-seq", Some(&token))
            .json(&bad_login())
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("5"));
        assert_eq!(
            header(&response, "x-ratelimit-remaining").as_deref(),
            Some(expected_remaining)
        );
    }

    let response = as_client(server.post("/api/v1/auth/login"), "auth-seq", Some(&token))
        .json(&bad_login())
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&response, "retry-after").as_deref(), Some("300"));
    assert_eq!(header(&response, "x-ratelimit-remaining").as_deref(), Some("0"));
    assert!(header(&response, "x-ratelimit-reset").is_some());

    let body: Value = response.json();
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["tier"], "auth");
    assert_eq!(body["limit"], 5);
    assert_eq!(body["window_seconds"], 300);
    assert_eq!(body["retry_after"], 300);
}

#[tokio::test]
async fn test_successful_responses_carry_quota_headers() {
    let server = memory_server(CountingMode::Lenient);

    let response = as_client(server.get("/api/v1/health"), "headers-check", None).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("100"));
    assert_eq!(header(&response, "x-ratelimit-remaining").as_deref(), Some("99"));
    assert!(header(&response, "retry-after").is_none());
}

#[tokio::test]
async fn test_unknown_routes_are_still_counted() {
    let server = memory_server(CountingMode::Lenient);

    let response = as_client(server.get("/no/such/route"), "fallback-check", None).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("100"));
}

#[tokio::test]
async fn test_tiers_are_counted_independently() {
    let server = memory_server(CountingMode::Lenient);

    for _ in 0..3 {
        let response = as_client(server.post("/api/v1/export/csv"), "tier-split", None).await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }
    let blocked = as_client(server.post("/api/v1/export/pdf"), "tier-split", None).await;
    assert_eq!(blocked.status_code(), StatusCode::TOO_MANY_REQUESTS);

    let upload = as_client(server.post("/api/v1/meter/upload"), "tier-split", None)
        .multipart(MultipartForm::new().add_part(
            "image",
            Part::bytes(b"\x89PNG fake".to_vec()).file_name("meter.png").mime_type("image/png"),
        ))
        .await;
    assert_eq!(upload.status_code(), StatusCode::OK);
    assert_eq!(header(&upload, "x-ratelimit-limit").as_deref(), Some("10"));
}

#[tokio::test]
async fn test_fingerprints_get_separate_budgets() {
    let server = memory_server(CountingMode::Lenient);

    for _ in 0..3 {
        as_client(server.post("/api/v1/export/csv"), "client-a/1.0", None).await;
    }
    let a = as_client(server.post("/api/v1/export/csv"), "client-a/1.0", None).await;
    let b = as_client(server.post("/api/v1/export/csv"), "client-b/1.0", None).await;

    assert_eq!(a.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(b.status_code(), StatusCode::OK);
    assert_eq!(header(&b, "x-ratelimit-remaining").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_logged_in_admin_gets_admin_budget() {
    let server = memory_server(CountingMode::Lenient);

    let login = as_client(server.post("/api/v1/auth/login"), "admin-console", None)
        .json(&json!({"username": "admin", "password": "admin123"}))
        .await;
    assert_eq!(login.status_code(), StatusCode::OK);
    let body: Value = login.json();
    let token = body["access_token"].as_str().unwrap().to_string();

    for _ in 0..5 {
        let response =
            as_client(server.post("/api/v1/export/csv"), "admin-console", Some(&token)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("200"));
    }
}

#[tokio::test]
async fn test_admin_claim_without_login_is_not_privileged() {
    let server = memory_server(CountingMode::Lenient);
    let forged = unsigned_token(json!({"sub": "mallory", "role": "admin"}));

    let response = as_client(server.post("/api/v1/export/csv"), "forger", Some(&forged)).await;
    assert_eq!(header(&response, "x-ratelimit-limit").as_deref(), Some("3"));
}

#[tokio::test]
async fn test_strict_mode_keeps_rejecting() {
    let server = memory_server(CountingMode::Strict);
    let token = unsigned_token(json!({"sub": 7}));

    for _ in 0..5 {
        let response = as_client(server.post("/api/v1/auth/refresh"), "strict", Some(&token))
            .json(&json!({"refresh_token": "bogus"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
    for _ in 0..2 {
        let response = as_client(server.post("/api/v1/auth/refresh"), "strict", Some(&token))
            .json(&json!({"refresh_token": "bogus"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn test_status_reports_quota_without_counting() {
    let server = memory_server(CountingMode::Lenient);

    for _ in 0..2 {
        as_client(server.post("/api/v1/export/excel"), "status-check", None).await;
    }

    for _ in 0..2 {
        let response = as_client(
            server.get("/api/v1/rate-limit/status?path=/api/v1/export/csv"),
            "status-check",
            None,
        )
        .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["tier"], "export");
        assert_eq!(body["limit"], 3);
        assert_eq!(body["remaining"], 1);
        assert_eq!(body["allowed"], true);
        assert_eq!(body["identity_source"], "fingerprint");
    }
}

#[tokio::test]
async fn test_cors_preflight_is_not_counted() {
    let server = memory_server(CountingMode::Lenient);

    let response = as_client(
        server.method(Method::OPTIONS, "/api/v1/export/csv"),
        "preflight",
        None,
    )
    .add_header(ORIGIN, HeaderValue::from_static("http://localhost:3000"))
    .add_header(
        HeaderName::from_static("access-control-request-method"),
        HeaderValue::from_static("POST"),
    )
    .await;
    assert!(header(&response, "x-ratelimit-limit").is_none());

    let first = as_client(server.post("/api/v1/export/csv"), "preflight", None).await;
    assert_eq!(header(&first, "x-ratelimit-remaining").as_deref(), Some("2"));
}

/// Store whose every call fails.
struct UnavailableStore;

#[async_trait]
impl CounterStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn incr(&self, _key: &str) -> Result<i64, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn expire(&self, _key: &str, _seconds: u64) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn ttl(&self, _key: &str) -> Result<KeyTtl, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn del(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn set_ex(&self, _key: &str, _value: &str, _seconds: u64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

#[tokio::test]
async fn test_store_outage_fails_open() {
    let state = AppState::new(
        Arc::new(UnavailableStore),
        &Settings::default(),
        JwtService::new(SECRET),
    );
    let server = server_for(state);

    for _ in 0..10 {
        let response = as_client(server.post("/api/v1/export/csv"), "outage", None).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-remaining").as_deref(), Some("2"));
    }

    let health = as_client(server.get("/health"), "outage", None).await;
    assert_eq!(health.status_code(), StatusCode::OK);
    let body: Value = health.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["rate_limit_store"]["reachable"], false);
}
