// Middleware module - request admission, CORS and observability

pub mod cors;
pub mod observability;
pub mod rate_limit;

// Re-export for convenience
pub use cors::{cors_layer_for, create_cors_layer, create_custom_cors_layer};
pub use observability::{LogFormat, init_tracing};
pub use rate_limit::{RateLimitRejection, apply_quota_headers, rate_limit_middleware};
