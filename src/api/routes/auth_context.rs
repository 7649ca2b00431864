//! Authentication context utilities.
//!
//! Extractors that verify the bearer token. Unlike admission, which only reads
//! the claimed subject, these check the signature and expiry.

use super::app_state::AppState;
use super::error::ApiError;
use crate::services::jwt_service::{Claims, JwtService};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// Verified caller, extracted from a valid access token.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub subject: String,
    pub role: String,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            role: claims.role,
        }
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(JwtService::extract_bearer_token)
            .ok_or_else(|| {
                tracing::warn!("No authorization token provided");
                ApiError::unauthorized("Missing bearer token")
            })?;

        let claims = state.jwt_service.validate_access_token(token).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            ApiError::unauthorized("Invalid or expired token")
        })?;

        if claims.sub.is_empty() {
            tracing::warn!("JWT has empty subject claim");
            return Err(ApiError::bad_request("Token has empty subject"));
        }

        Ok(claims.into())
    }
}

/// Verified caller holding the admin role.
#[derive(Clone, Debug)]
pub struct AdminContext(pub AuthContext);

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = AuthContext::from_request_parts(parts, state).await?;
        if !context.is_admin() {
            tracing::warn!("Non-admin {} attempted an admin operation", context.subject);
            return Err(ApiError::new(
                axum::http::StatusCode::FORBIDDEN,
                "Admin role required",
            ));
        }
        Ok(AdminContext(context))
    }
}
