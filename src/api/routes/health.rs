//! Health check routes.

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::app_state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct StoreHealth {
    pub backend: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the counter store is unreachable
    pub status: String,
    pub service: String,
    pub version: String,
    pub rate_limit_store: StoreHealth,
}

/// GET /health - Service status and counter store reachability
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ping = state.store.ping().await;
    let status = if ping.is_ok() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        service: "accuread-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rate_limit_store: StoreHealth {
            backend: state.store_backend().to_string(),
            reachable: ping.is_ok(),
            error: ping.err().map(|e| e.to_string()),
        },
    })
}
