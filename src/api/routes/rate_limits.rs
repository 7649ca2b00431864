//! Rate limit status and administration routes.

use axum::{
    Router,
    extract::{ConnectInfo, Path, Query, State},
    http::{Extensions, HeaderMap},
    response::Json,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::app_state::AppState;
use super::auth_context::AdminContext;
use super::error::ApiError;
use crate::models::{IdentitySource, RateLimitDecision, RateLimitPolicy, RateLimitStats, Tier};
use crate::services::endpoint_classifier::classify;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Path to report the quota for; defaults to the default tier
    pub path: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RateLimitStatus {
    pub path: String,
    pub identity_source: IdentitySource,
    #[serde(flatten)]
    pub decision: RateLimitDecision,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RateLimitOverview {
    /// Active counter store backend
    pub backend: String,
    pub policies: Vec<RateLimitPolicy>,
    /// Live counters per tier
    pub usage: RateLimitStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    pub tier: Tier,
    pub identifier: String,
    /// False when no counter existed
    pub removed: bool,
}

/// Create the caller-facing status router
pub fn status_router() -> Router<AppState> {
    Router::new().route("/status", get(get_rate_limit_status))
}

/// Create the admin router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/rate-limits", get(get_rate_limit_overview))
        .route("/rate-limits/{tier}/{identifier}", delete(reset_rate_limit))
}

/// GET /rate-limit/status - Remaining quota for the caller, without counting
#[utoipa::path(
    get,
    path = "/rate-limit/status",
    tag = "Rate Limits",
    params(StatusQuery),
    responses(
        (status = 200, description = "Current quota", body = RateLimitStatus)
    )
)]
pub async fn get_rate_limit_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Json<RateLimitStatus> {
    let client_ip = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let identity = state.resolver.resolve(&headers, client_ip).await;

    let path = query.path.unwrap_or_else(|| "/".to_string());
    let tier = identity.effective_tier(classify(&path));
    let decision = state.limiter.peek(&identity, tier).await;

    Json(RateLimitStatus {
        path,
        identity_source: identity.source,
        decision,
    })
}

/// GET /admin/rate-limits - Policies and live counter totals
#[utoipa::path(
    get,
    path = "/admin/rate-limits",
    tag = "Rate Limits",
    responses(
        (status = 200, description = "Rate limit overview", body = RateLimitOverview),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 503, description = "Counter store unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_rate_limit_overview(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<RateLimitOverview>, ApiError> {
    let usage = state.limiter.aggregate().await?;

    Ok(Json(RateLimitOverview {
        backend: state.store_backend().to_string(),
        policies: state.limiter.policies().iter().copied().collect(),
        usage,
    }))
}

/// DELETE /admin/rate-limits/{tier}/{identifier} - Clear one counter
#[utoipa::path(
    delete,
    path = "/admin/rate-limits/{tier}/{identifier}",
    tag = "Rate Limits",
    params(
        ("tier" = String, Path, description = "Tier name"),
        ("identifier" = String, Path, description = "Client identifier, e.g. user:42")
    ),
    responses(
        (status = 200, description = "Counter reset", body = ResetResponse),
        (status = 400, description = "Unknown tier"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 503, description = "Counter store unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reset_rate_limit(
    State(state): State<AppState>,
    AdminContext(admin): AdminContext,
    Path((tier, identifier)): Path<(String, String)>,
) -> Result<Json<ResetResponse>, ApiError> {
    let tier: Tier = tier.parse()?;
    let removed = state.limiter.reset(&identifier, tier).await?;
    info!(
        "{} reset {} rate limit for {} (existed: {})",
        admin.subject, tier, identifier, removed
    );

    Ok(Json(ResetResponse {
        tier,
        identifier,
        removed,
    }))
}
