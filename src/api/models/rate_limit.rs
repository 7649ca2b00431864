//! Rate limiting domain types.
//!
//! Tiers, per-tier policies, resolved client identities and the decisions the
//! admission layer hands back to the request pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Key namespace shared by every rate limit counter.
pub const RATE_LIMIT_KEY_PREFIX: &str = "rate_limit";

/// Named rate limit bucket applied per endpoint classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Default,
    Auth,
    Ocr,
    Upload,
    Export,
    Admin,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Default,
        Tier::Auth,
        Tier::Ocr,
        Tier::Upload,
        Tier::Export,
        Tier::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::Auth => "auth",
            Tier::Ocr => "ocr",
            Tier::Upload => "upload",
            Tier::Export => "export",
            Tier::Admin => "admin",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tier name has no policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown rate limit tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Tier::Default),
            "auth" => Ok(Tier::Auth),
            "ocr" => Ok(Tier::Ocr),
            "upload" => Ok(Tier::Upload),
            "export" => Ok(Tier::Export),
            "admin" => Ok(Tier::Admin),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// Request budget for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitPolicy {
    pub tier: Tier,
    pub max_requests: u32,
    pub window_seconds: u64,
}

/// Where a client identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// Subject claim of a bearer token
    User,
    /// Hash of client address and user agent
    Fingerprint,
}

/// Caller identity derived per request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClientIdentity {
    /// `user:<id>` or a hex fingerprint
    pub raw_identifier: String,
    pub is_privileged: bool,
    pub source: IdentitySource,
}

impl ClientIdentity {
    pub fn user(subject: &str, is_privileged: bool) -> Self {
        Self {
            raw_identifier: format!("user:{}", subject),
            is_privileged,
            source: IdentitySource::User,
        }
    }

    pub fn fingerprint(hash: String) -> Self {
        Self {
            raw_identifier: hash,
            is_privileged: false,
            source: IdentitySource::Fingerprint,
        }
    }

    /// Tier actually charged: privileged callers always use the admin budget.
    pub fn effective_tier(&self, classified: Tier) -> Tier {
        if self.is_privileged {
            Tier::Admin
        } else {
            classified
        }
    }
}

/// Store key for a (tier, identifier) counter.
pub fn counter_key(tier: Tier, identifier: &str) -> String {
    format!("{}:{}:{}", RATE_LIMIT_KEY_PREFIX, tier, identifier)
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the current window ends
    pub reset_time: u64,
    /// Seconds the client should wait; zero when allowed
    pub retry_after: u64,
    pub tier: Tier,
    pub window_seconds: u64,
}

/// Counter totals for one tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TierStats {
    pub distinct_identifiers: u64,
    pub total_requests: u64,
}

/// Counter totals keyed by tier name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RateLimitStats(pub BTreeMap<String, TierStats>);

impl RateLimitStats {
    pub fn tier(&self, tier: Tier) -> Option<&TierStats> {
        self.0.get(tier.as_str())
    }
}
