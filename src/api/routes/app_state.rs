//! Application state management.
//!
//! Defines the AppState struct that holds all shared application state: the
//! counter store, decision engine (which owns the policy table), identifier
//! resolver, JWT service, user directory and export queue.

use crate::config::Settings;
use crate::services::export_queue::ExportQueue;
use crate::services::identity_resolver::{ClientIdentifierResolver, StoreRoleLookup};
use crate::services::jwt_service::{JwtService, SharedJwtService};
use crate::services::policy_table::SharedPolicyTable;
use crate::services::rate_limiter::{RateLimiter, SharedRateLimiter};
use crate::services::user_directory::UserDirectory;
use crate::storage::{
    MemoryCounterStore, RedisCounterStore, RedisStoreConfig, SharedCounterStore,
};
use axum::extract::FromRef;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Application state shared across all route handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// Shared counter store (Redis or in-memory)
    pub store: SharedCounterStore,
    /// Decision engine
    pub limiter: SharedRateLimiter,
    pub resolver: Arc<ClientIdentifierResolver>,
    pub jwt_service: SharedJwtService,
    pub users: UserDirectory,
    pub exports: ExportQueue,
}

impl AppState {
    /// Build the state around an already connected store.
    pub fn new(store: SharedCounterStore, settings: &Settings, jwt_service: JwtService) -> Self {
        let policies: SharedPolicyTable = Arc::new(settings.policies.clone());
        let limiter = Arc::new(RateLimiter::new(
            store.clone(),
            policies,
            settings.counting_mode,
        ));
        let resolver = Arc::new(ClientIdentifierResolver::new(Arc::new(
            StoreRoleLookup::new(store.clone()),
        )));

        Self {
            store,
            limiter,
            resolver,
            jwt_service: Arc::new(jwt_service),
            users: UserDirectory::new(),
            exports: ExportQueue::new(),
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(settings: &Settings, jwt_service: JwtService) -> Self {
        Self::new(Arc::new(MemoryCounterStore::new()), settings, jwt_service)
    }

    /// Name of the active store backend.
    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }
}

/// Connect the counter store named by the settings.
///
/// Uses Redis when `REDIS_URL` is set and reachable. Otherwise falls back to
/// the in-memory store, which only limits within this process.
pub async fn connect_store(settings: &Settings) -> SharedCounterStore {
    let Some(url) = settings.redis_url.as_deref() else {
        warn!("REDIS_URL not set; rate limits are enforced per process only");
        return Arc::new(MemoryCounterStore::new());
    };

    let config = RedisStoreConfig {
        command_timeout: settings.store_timeout,
        connect_timeout: settings.connect_timeout,
    };

    match RedisCounterStore::connect(url, config).await {
        Ok(store) => {
            info!("Connected to Redis rate limit store");
            Arc::new(store)
        }
        Err(e) => {
            error!(
                "Failed to connect to Redis: {}. Falling back to in-memory rate limit store",
                e
            );
            Arc::new(MemoryCounterStore::new())
        }
    }
}

// Allow sub-states to be extracted from AppState (for Axum)
impl FromRef<AppState> for SharedCounterStore {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for SharedRateLimiter {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.limiter.clone()
    }
}

impl FromRef<AppState> for SharedJwtService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt_service.clone()
    }
}
