//! API routes module - organizes all route handlers.
//!
//! Every route, including the 404 fallback, sits behind the admission
//! middleware installed by `create_app`.

pub mod app_state;
pub mod auth;
pub mod auth_context;
pub mod error;
pub mod export;
pub mod health;
pub mod meter;
pub mod openapi;
pub mod rate_limits;

use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::middleware::{cors_layer_for, rate_limit_middleware};
use crate::services::jwt_service::JwtService;
pub use app_state::{AppState, connect_store};
use error::ApiError;

/// Create the API router mounted under /api/v1
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_router())
        .nest("/meter", meter::meter_router())
        .nest("/export", export::export_router())
        .nest("/rate-limit", rate_limits::status_router())
        .nest("/admin", rate_limits::admin_router())
        .route("/health", get(health::health_check))
        // OpenAPI documentation endpoints
        .merge(openapi::openapi_router())
}

/// Build the full application: routes, admission middleware, tracing and CORS.
///
/// Trace and CORS wrap the admission middleware, so preflight requests are
/// answered before they are counted.
pub fn create_app(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", create_api_router())
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer_for(allowed_origins)),
        )
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

/// Create the application state over the store named by the settings.
pub async fn create_app_state(settings: &Settings, jwt_service: JwtService) -> AppState {
    let store = connect_store(settings).await;
    AppState::new(store, settings, jwt_service)
}

/// Create an in-memory application state (single process, tests).
pub fn create_in_memory_app_state(settings: &Settings, jwt_service: JwtService) -> AppState {
    AppState::in_memory(settings, jwt_service)
}
