//! Services module - request admission logic and supporting services.

pub mod endpoint_classifier;
pub mod export_queue;
pub mod identity_resolver;
pub mod jwt_service;
pub mod policy_table;
pub mod rate_limiter;
pub mod user_directory;

// Re-export for convenience
pub use endpoint_classifier::classify;
pub use export_queue::ExportQueue;
pub use identity_resolver::{ClientIdentifierResolver, RoleLookup, StoreRoleLookup, role_cache_key};
pub use jwt_service::{Claims, JwtService, SharedJwtService, TokenPair, TokenType};
pub use policy_table::{PolicyTable, SharedPolicyTable};
pub use rate_limiter::{RateLimiter, SharedRateLimiter};
pub use user_directory::{UserAccount, UserDirectory};
