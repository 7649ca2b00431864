//! Tier policy table.
//!
//! Built once at startup from the built-in defaults plus optional
//! `RATE_LIMIT_<TIER>_REQUESTS` / `RATE_LIMIT_<TIER>_WINDOW_SECS` overrides,
//! immutable afterwards.

use crate::config::ConfigError;
use crate::models::{RateLimitPolicy, Tier};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Longest accepted window override: one year.
pub const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Built-in (max_requests, window_seconds) per tier.
fn default_budget(tier: Tier) -> (u32, u64) {
    match tier {
        Tier::Default => (100, 60),
        Tier::Ocr => (30, 60),
        Tier::Upload => (10, 60),
        Tier::Auth => (5, 300),
        Tier::Export => (3, 300),
        Tier::Admin => (200, 60),
    }
}

/// Immutable tier → policy mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: BTreeMap<Tier, RateLimitPolicy>,
}

pub type SharedPolicyTable = Arc<PolicyTable>;

impl Default for PolicyTable {
    fn default() -> Self {
        let policies = Tier::ALL
            .into_iter()
            .map(|tier| {
                let (max_requests, window_seconds) = default_budget(tier);
                (
                    tier,
                    RateLimitPolicy {
                        tier,
                        max_requests,
                        window_seconds,
                    },
                )
            })
            .collect();
        Self { policies }
    }
}

impl PolicyTable {
    /// Build the table from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the table from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table = Self::default();
        for tier in Tier::ALL {
            let upper = tier.as_str().to_uppercase();
            let requests_var = format!("RATE_LIMIT_{}_REQUESTS", upper);
            let window_var = format!("RATE_LIMIT_{}_WINDOW_SECS", upper);

            let requests = parse_positive::<u32>(&requests_var, lookup(&requests_var))?;
            let window = parse_positive::<u64>(&window_var, lookup(&window_var))?;
            if let Some(window) = window.filter(|w| *w > MAX_WINDOW_SECONDS) {
                return Err(ConfigError::InvalidValue {
                    name: window_var,
                    value: window.to_string(),
                    reason: format!("must be at most {} seconds", MAX_WINDOW_SECONDS),
                });
            }

            if let Some(policy) = table.policies.get_mut(&tier) {
                if let Some(requests) = requests {
                    policy.max_requests = requests;
                }
                if let Some(window) = window {
                    policy.window_seconds = window;
                }
            }
        }
        Ok(table)
    }

    /// Policy for a tier. Falls back to the default tier's policy.
    pub fn policy_for(&self, tier: Tier) -> RateLimitPolicy {
        self.policies
            .get(&tier)
            .or_else(|| self.policies.get(&Tier::Default))
            .copied()
            .unwrap_or_else(|| {
                let (max_requests, window_seconds) = default_budget(Tier::Default);
                RateLimitPolicy {
                    tier: Tier::Default,
                    max_requests,
                    window_seconds,
                }
            })
    }

    /// Policy for a tier name. Unknown names resolve to the default tier.
    pub fn policy_for_name(&self, name: &str) -> RateLimitPolicy {
        match name.parse::<Tier>() {
            Ok(tier) => self.policy_for(tier),
            Err(e) => {
                tracing::debug!("{}; using default policy", e);
                self.policy_for(Tier::Default)
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RateLimitPolicy> {
        self.policies.values()
    }
}

fn parse_positive<T>(name: &str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Some(value))
}
