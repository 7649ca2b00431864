//! Basic API integration tests

use accuread_api::config::Settings;
use accuread_api::routes::{create_app, create_in_memory_app_state};
use accuread_api::services::jwt_service::JwtService;
use accuread_api::storage::CounterStore;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{Value, json};

const SECRET: &str = "basic-api-test-secret-0123456789abcdef";

fn image_form(mime: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new()
        .add_text("note", "kitchen meter")
        .add_part("image", Part::bytes(bytes).file_name("meter.jpg").mime_type(mime))
}

fn create_test_server() -> TestServer {
    let state = create_in_memory_app_state(&Settings::default(), JwtService::new(SECRET));
    TestServer::new(create_app(state, &[])).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();

    for path in ["/health", "/api/v1/health"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rate_limit_store"]["backend"], "memory");
        assert_eq!(body["rate_limit_store"]["reachable"], true);
    }
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let server = create_test_server();

    let response = server.get("/api/v1/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["paths"]["/admin/rate-limits"].is_object());
    assert!(body["paths"]["/auth/login"].is_object());
}

#[tokio::test]
async fn test_login_caches_role_and_refresh_rotates_tokens() {
    let settings = Settings::default();
    let state = create_in_memory_app_state(&settings, JwtService::new(SECRET));
    let store = state.store.clone();
    let server = TestServer::new(create_app(state, &[])).unwrap();

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({"username": "admin", "password": "admin123"}))
        .await;
    assert_eq!(login.status_code(), StatusCode::OK);
    let tokens: Value = login.json();
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 1800);
    assert_eq!(store.get("user_role:admin").await.unwrap().as_deref(), Some("admin"));

    let refresh = server
        .post("/api/v1/auth/refresh")
        .json(&json!({"refresh_token": tokens["refresh_token"]}))
        .await;
    assert_eq!(refresh.status_code(), StatusCode::OK);
    let refreshed: Value = refresh.json();
    assert!(refreshed["access_token"].as_str().is_some());

    let rejected = server
        .post("/api/v1/auth/refresh")
        .json(&json!({"refresh_token": tokens["access_token"]}))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({"username": "admin", "password": "nope"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Incorrect username or password");
}

#[tokio::test]
async fn test_extract_meter_reading() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/meter/extract-meter-reading")
        .multipart(image_form("image/jpeg", b"\xff\xd8\xff jpeg".to_vec()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "30");
    let body: Value = response.json();
    assert_eq!(body["data"]["serialNumber"], "ABC123XYZ");
    assert_eq!(body["processed"], true);
}

#[tokio::test]
async fn test_extract_rejects_non_image() {
    let server = create_test_server();

    let text_file = server
        .post("/api/v1/meter/extract-meter-reading")
        .add_header(USER_AGENT, HeaderValue::from_static("not-an-image"))
        .multipart(image_form("text/plain", b"hello".to_vec()))
        .await;
    assert_eq!(text_file.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = text_file.json();
    assert_eq!(body["error"], "File must be an image");

    let no_image = server
        .post("/api/v1/meter/extract-meter-reading")
        .add_header(USER_AGENT, HeaderValue::from_static("not-an-image"))
        .multipart(MultipartForm::new().add_text("note", "forgot the photo"))
        .await;
    assert_eq!(no_image.status_code(), StatusCode::BAD_REQUEST);

    let raw_json = server
        .post("/api/v1/meter/extract-meter-reading")
        .add_header(USER_AGENT, HeaderValue::from_static("not-an-image"))
        .json(&json!({"image": "base64?"}))
        .await;
    assert_eq!(raw_json.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_accepts_photos_up_to_ten_megabytes() {
    let server = create_test_server();

    let photo = server
        .post("/api/v1/meter/upload")
        .add_header(USER_AGENT, HeaderValue::from_static("big-photos"))
        .multipart(image_form("image/jpeg", vec![0xAB; 3 * 1024 * 1024]))
        .await;
    assert_eq!(photo.status_code(), StatusCode::OK);
    let receipt: Value = photo.json();
    assert_eq!(receipt["bytes_received"], 3 * 1024 * 1024);
    assert_eq!(receipt["file_name"], "meter.jpg");
    assert_eq!(receipt["content_type"], "image/jpeg");

    let too_big = server
        .post("/api/v1/meter/upload")
        .add_header(USER_AGENT, HeaderValue::from_static("big-photos"))
        .multipart(image_form("image/jpeg", vec![0xAB; 11 * 1024 * 1024]))
        .await;
    assert_eq!(too_big.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_export_formats() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/export/excel")
        .add_header(USER_AGENT, HeaderValue::from_static("exporter"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let job: Value = response.json();
    assert_eq!(job["format"], "excel");
    assert_eq!(job["status"], "queued");
    assert!(job["export_id"].as_str().is_some());

    let unsupported = server
        .post("/api/v1/export/docx")
        .add_header(USER_AGENT, HeaderValue::from_static("exporter"))
        .await;
    assert_eq!(unsupported.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_status_and_history() {
    let server = create_test_server();

    let created = server
        .post("/api/v1/export/csv")
        .add_header(USER_AGENT, HeaderValue::from_static("export-tracker"))
        .await;
    let job: Value = created.json();
    let export_id = job["export_id"].as_str().unwrap().to_string();

    let status = server
        .get(&format!("/api/v1/export/status/{}", export_id))
        .add_header(USER_AGENT, HeaderValue::from_static("export-tracker"))
        .await;
    assert_eq!(status.status_code(), StatusCode::OK);
    let tracked: Value = status.json();
    assert_eq!(tracked["export_id"], export_id.as_str());
    assert!(["queued", "processing", "completed"].contains(&tracked["status"].as_str().unwrap()));

    let history = server
        .get("/api/v1/export/history")
        .add_header(USER_AGENT, HeaderValue::from_static("export-tracker"))
        .await;
    assert_eq!(history.status_code(), StatusCode::OK);
    let jobs: Value = history.json();
    assert_eq!(jobs[0]["export_id"], export_id.as_str());
    // Three export-tier requests exhaust the budget
    assert_eq!(history.headers().get("x-ratelimit-remaining").unwrap(), "0");

    let other_client = server
        .get("/api/v1/export/status/no-such-job")
        .add_header(USER_AGENT, HeaderValue::from_static("export-tracker-2"))
        .await;
    assert_eq!(other_client.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_me_and_logout() {
    let settings = Settings::default();
    let state = create_in_memory_app_state(&settings, JwtService::new(SECRET));
    let store = state.store.clone();
    let server = TestServer::new(create_app(state, &[])).unwrap();

    let signup = server
        .post("/api/v1/auth/signup")
        .json(&json!({"username": "reader", "email": "reader@example.com", "password": "pw"}))
        .await;
    assert_eq!(signup.status_code(), StatusCode::OK);
    assert_eq!(signup.headers().get("x-ratelimit-limit").unwrap(), "5");
    let account: Value = signup.json();
    assert_eq!(account["username"], "reader");
    assert_eq!(account["role"], "user");

    let taken = server
        .post("/api/v1/auth/signup")
        .json(&json!({"username": "admin", "email": "a@example.com", "password": "pw"}))
        .await;
    assert_eq!(taken.status_code(), StatusCode::BAD_REQUEST);

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({"username": "admin", "password": "admin123"}))
        .await;
    let tokens: Value = login.json();
    let bearer = format!("Bearer {}", tokens["access_token"].as_str().unwrap());

    let me = server
        .get("/api/v1/auth/me")
        .add_header(axum::http::header::AUTHORIZATION, HeaderValue::from_str(&bearer).unwrap())
        .await;
    assert_eq!(me.status_code(), StatusCode::OK);
    let me: Value = me.json();
    assert_eq!(me["id"], 1);
    assert_eq!(me["email"], "admin@example.com");

    let anonymous = server.get("/api/v1/auth/me").await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let logout = server
        .post("/api/v1/auth/logout")
        .add_header(axum::http::header::AUTHORIZATION, HeaderValue::from_str(&bearer).unwrap())
        .await;
    assert_eq!(logout.status_code(), StatusCode::OK);
    assert_eq!(store.get("user_role:admin").await.unwrap(), None);
}
