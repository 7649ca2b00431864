//! OpenAPI specification definition.
//!
//! Aggregates all route handlers and schemas for OpenAPI documentation generation.

use utoipa::{Modify, OpenApi};
#[derive(OpenApi)]
#[openapi(
    paths(
        // Authentication
        crate::routes::auth::login,
        crate::routes::auth::refresh_token,
        crate::routes::auth::signup,
        crate::routes::auth::logout,
        crate::routes::auth::current_user,
        // Meter
        crate::routes::meter::extract_meter_reading,
        crate::routes::meter::upload_image,
        // Export
        crate::routes::export::create_export,
        crate::routes::export::export_status,
        crate::routes::export::export_history,
        // Rate limits
        crate::routes::rate_limits::get_rate_limit_status,
        crate::routes::rate_limits::get_rate_limit_overview,
        crate::routes::rate_limits::reset_rate_limit,
        // Health
        crate::routes::health::health_check,
        // OpenAPI
        crate::routes::openapi::serve_openapi_json,
    ),
    components(schemas(
        crate::routes::auth::LoginRequest,
        crate::routes::auth::RefreshTokenRequest,
        crate::routes::auth::SignupRequest,
        crate::routes::auth::LogoutResponse,
        crate::services::user_directory::UserAccount,
        crate::services::jwt_service::TokenPair,
        crate::models::ExtractionResult,
        crate::models::MeterReadingData,
        crate::models::MeterReadingConfidence,
        crate::models::UploadReceipt,
        crate::routes::meter::MeterImageForm,
        crate::models::ExportFormat,
        crate::models::ExportState,
        crate::models::ExportJob,
        crate::models::Tier,
        crate::models::IdentitySource,
        crate::models::RateLimitPolicy,
        crate::models::RateLimitDecision,
        crate::models::TierStats,
        crate::models::RateLimitStats,
        crate::routes::rate_limits::RateLimitStatus,
        crate::routes::rate_limits::RateLimitOverview,
        crate::routes::rate_limits::ResetResponse,
        crate::routes::health::HealthResponse,
        crate::routes::health::StoreHealth,
        crate::middleware::rate_limit::RateLimitErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, signup, token refresh and account info"),
        (name = "Meter", description = "Meter reading extraction and uploads"),
        (name = "Export", description = "Reading export jobs"),
        (name = "Rate Limits", description = "Quota status and rate limit administration"),
        (name = "Health", description = "Service health"),
        (name = "OpenAPI", description = "OpenAPI specification"),
    ),
    info(
        title = "AccuRead API",
        description = "Meter reading API with distributed per-tier rate limiting",
        version = "1.0.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8081/api/v1", description = "Local development server")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        // Update version to match Cargo.toml version
        openapi.info.version = env!("CARGO_PKG_VERSION").to_string();

        use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
        openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new)
            .add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
    }
}
