//! Client identifier resolution.
//!
//! A caller is identified by the subject of its bearer token when one can be
//! read, otherwise by a fingerprint of client address and user agent.
//! Privilege comes only from the role cache, never from the token itself.

use crate::models::ClientIdentity;
use crate::services::jwt_service::JwtService;
use crate::storage::{SharedCounterStore, StoreError};
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt, UserAgent};
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

const ROLE_CACHE_PREFIX: &str = "user_role";
const ADMIN_ROLE: &str = "admin";
const UNKNOWN: &str = "unknown";

/// Store key holding the cached role of a subject.
pub fn role_cache_key(subject: &str) -> String {
    format!("{}:{}", ROLE_CACHE_PREFIX, subject)
}

/// Read-only role lookup used to decide privilege.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn role_of(&self, subject: &str) -> Result<Option<String>, StoreError>;
}

/// Role lookup backed by the shared counter store (`user_role:<subject>`).
#[derive(Clone)]
pub struct StoreRoleLookup {
    store: SharedCounterStore,
}

impl StoreRoleLookup {
    pub fn new(store: SharedCounterStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RoleLookup for StoreRoleLookup {
    async fn role_of(&self, subject: &str) -> Result<Option<String>, StoreError> {
        self.store.get(&role_cache_key(subject)).await
    }
}

/// Hex of the first 128 bits of SHA-256(`ip|user_agent`).
pub fn fingerprint(client_ip: &str, user_agent: &str) -> String {
    let digest = Sha256::digest(format!("{}|{}", client_ip, user_agent).as_bytes());
    hex::encode(&digest[..16])
}

/// Derives a stable identifier for each caller.
#[derive(Clone)]
pub struct ClientIdentifierResolver {
    roles: Arc<dyn RoleLookup>,
}

impl ClientIdentifierResolver {
    pub fn new(roles: Arc<dyn RoleLookup>) -> Self {
        Self { roles }
    }

    pub async fn resolve(&self, headers: &HeaderMap, client_addr: Option<IpAddr>) -> ClientIdentity {
        if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
            match JwtService::read_unverified_claims(bearer.token()) {
                Ok(claims) => {
                    let is_privileged = self.is_admin(&claims.subject).await;
                    return ClientIdentity::user(&claims.subject, is_privileged);
                }
                Err(e) => debug!("Falling back to fingerprint identity: {}", e),
            }
        }

        let ip = client_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let user_agent = headers
            .typed_get::<UserAgent>()
            .map(|ua| ua.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        ClientIdentity::fingerprint(fingerprint(&ip, &user_agent))
    }

    async fn is_admin(&self, subject: &str) -> bool {
        match self.roles.role_of(subject).await {
            Ok(role) => role.as_deref() == Some(ADMIN_ROLE),
            Err(e) => {
                warn!("Role lookup failed for {}: {}", subject, e);
                false
            }
        }
    }
}
