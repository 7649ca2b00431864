//! Authentication routes with JWT tokens.
//!
//! - Access tokens: 30 minutes
//! - Refresh tokens: 7 days
//!
//! A successful login also caches the user's role under `user_role:<subject>`
//! for the access token's lifetime. The admission middleware reads that cache
//! to decide whether a caller gets the admin budget.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::app_state::AppState;
use super::auth_context::AuthContext;
use super::error::ApiError;
use crate::services::identity_resolver::role_cache_key;
use crate::services::jwt_service::TokenPair;
use crate::services::user_directory::UserAccount;

/// Id handed to accounts created through signup, which are not persisted.
const UNSAVED_ACCOUNT_ID: u64 = 999;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Create the auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/me", get(current_user))
}

/// POST /auth/login - Exchange credentials for a token pair
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Incorrect username or password"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let user = state
        .users
        .authenticate(&request.username, &request.password)
        .ok_or_else(|| {
            warn!("Failed login attempt for {}", request.username);
            ApiError::unauthorized("Incorrect username or password")
        })?;

    let tokens = state
        .jwt_service
        .generate_token_pair(&user.username, &user.role)
        .map_err(|e| {
            warn!("Failed to issue tokens: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e)
        })?;

    cache_role(&state, &user.username, &user.role).await;
    info!("User {} logged in", user.username);

    Ok(Json(tokens))
}

/// POST /auth/refresh - Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Authentication",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenPair),
        (status = 401, description = "Invalid refresh token"),
        (status = 429, description = "Too many refresh attempts")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let claims = state
        .jwt_service
        .validate_refresh_token(&request.refresh_token)
        .map_err(|e| {
            warn!("Invalid refresh token: {}", e);
            ApiError::unauthorized("Invalid refresh token")
        })?;

    // Role comes from the directory so a changed role takes effect on refresh
    let role = state
        .users
        .find(&claims.sub)
        .map(|user| user.role)
        .ok_or_else(|| {
            warn!("Refresh for unknown user {}", claims.sub);
            ApiError::unauthorized("Invalid refresh token")
        })?;

    let tokens = state
        .jwt_service
        .generate_token_pair(&claims.sub, &role)
        .map_err(|e| {
            warn!("Failed to refresh token: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e)
        })?;

    cache_role(&state, &claims.sub, &role).await;
    info!("Refreshed tokens for {}", claims.sub);

    Ok(Json(tokens))
}

/// POST /auth/signup - Register an account
///
/// Accounts are validated and echoed back but not stored; only the built-in
/// directory can log in.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Account registered", body = UserAccount),
        (status = 400, description = "Invalid or already registered username"),
        (status = 429, description = "Too many signup attempts")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<UserAccount>, ApiError> {
    let username = request.username.trim();
    if username.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    if !request.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if state.users.find(username).is_some() {
        return Err(ApiError::bad_request("Username already registered"));
    }

    info!("Registered account {}", username);
    Ok(Json(UserAccount {
        id: UNSAVED_ACCOUNT_ID,
        username: username.to_string(),
        email: request.email,
        role: "user".to_string(),
    }))
}

/// POST /auth/logout - Drop the caller's cached role
///
/// Tokens stay valid until they expire; the caller loses the admin budget at
/// once.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Json<LogoutResponse> {
    if let Err(e) = state.store.del(&role_cache_key(&auth.subject)).await {
        warn!("Failed to clear cached role for {}: {}", auth.subject, e);
    }
    info!("User {} logged out", auth.subject);

    Json(LogoutResponse {
        message: "Successfully logged out".to_string(),
    })
}

/// GET /auth/me - Account behind the access token
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current account", body = UserAccount),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn current_user(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<UserAccount>, ApiError> {
    state
        .users
        .find(&auth.subject)
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "User not found"))
}

/// Best effort: without the cache entry the caller is simply not privileged.
async fn cache_role(state: &AppState, subject: &str, role: &str) {
    let ttl = state.jwt_service.access_token_seconds();
    if let Err(e) = state.store.set_ex(&role_cache_key(subject), role, ttl).await {
        warn!("Failed to cache role for {}: {}", subject, e);
    }
}
