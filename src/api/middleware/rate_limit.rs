//! Rate limiting middleware.
//!
//! Resolves the caller, classifies the path into a tier and asks the decision
//! engine for admission. Every response carries the quota headers; denied
//! requests are answered here with 429 and never reach a handler.

use crate::models::{RateLimitDecision, Tier};
use crate::routes::app_state::AppState;
use crate::services::endpoint_classifier::classify;
use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::warn;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// JSON body of a 429 response.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RateLimitErrorBody {
    pub error: String,
    pub message: String,
    pub tier: Tier,
    pub limit: u32,
    pub window_seconds: u64,
    pub retry_after: u64,
}

/// Response sent when a request exceeds its tier budget.
#[derive(Debug)]
pub struct RateLimitRejection {
    decision: RateLimitDecision,
}

impl RateLimitRejection {
    pub fn new(decision: RateLimitDecision) -> Self {
        Self { decision }
    }
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let decision = self.decision;
        let body = RateLimitErrorBody {
            error: "Rate limit exceeded".to_string(),
            message: format!(
                "Too many requests. Limit: {} per {} seconds",
                decision.limit, decision.window_seconds
            ),
            tier: decision.tier,
            limit: decision.limit,
            window_seconds: decision.window_seconds,
            retry_after: decision.retry_after,
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        let headers = response.headers_mut();
        apply_quota_headers(headers, &decision);
        headers.insert(RETRY_AFTER, HeaderValue::from(decision.retry_after));
        response
    }
}

/// Write the three quota headers for a decision.
pub fn apply_quota_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_time));
}

/// Admission middleware, installed router-wide with `from_fn_with_state`.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let identity = state.resolver.resolve(request.headers(), client_ip).await;
    let tier = identity.effective_tier(classify(request.uri().path()));
    let decision = state.limiter.check(&identity, tier).await;

    if !decision.allowed {
        warn!(
            "Rate limit exceeded for {} on {} ({} tier)",
            identity.raw_identifier,
            request.uri().path(),
            tier
        );
        return RateLimitRejection::new(decision).into_response();
    }

    let mut response = next.run(request).await;
    apply_quota_headers(response.headers_mut(), &decision);
    response
}
