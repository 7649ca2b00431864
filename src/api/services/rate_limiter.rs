//! Rate limit decision engine.
//!
//! Fixed-window counters in the shared store, keyed
//! `rate_limit:<tier>:<identifier>`. The window starts with the first counted
//! request and ends when the key's TTL runs out.
//!
//! Two counting modes:
//! - `Lenient` reads the counter, compares, then increments. Concurrent
//!   requests that read the same value can each be admitted, so a counter may
//!   overshoot the limit by the number of racing readers.
//! - `Strict` increments first and compares the post-increment value, which
//!   admits exactly `max_requests` per window. Rejected attempts stay counted.
//!
//! On the request path every store failure fails open: the request is
//! admitted and the error is logged. `aggregate` and `reset` are operator
//! calls and return store errors to the caller.

use crate::config::CountingMode;
use crate::models::rate_limit::RATE_LIMIT_KEY_PREFIX;
use crate::models::{
    ClientIdentity, RateLimitDecision, RateLimitPolicy, RateLimitStats, Tier, TierStats,
    counter_key,
};
use crate::services::policy_table::{PolicyTable, SharedPolicyTable};
use crate::storage::{KeyTtl, SharedCounterStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decision engine shared by the admission middleware and the admin routes.
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedCounterStore,
    policies: SharedPolicyTable,
    mode: CountingMode,
}

pub type SharedRateLimiter = Arc<RateLimiter>;

fn now_epoch_seconds() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

impl RateLimiter {
    pub fn new(store: SharedCounterStore, policies: SharedPolicyTable, mode: CountingMode) -> Self {
        Self {
            store,
            policies,
            mode,
        }
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Count this request against `tier` and decide whether to admit it.
    pub async fn check(&self, identity: &ClientIdentity, tier: Tier) -> RateLimitDecision {
        let policy = self.policies.policy_for(tier);
        let key = counter_key(policy.tier, &identity.raw_identifier);

        let outcome = match self.mode {
            CountingMode::Lenient => self.check_lenient(&key, &policy).await,
            CountingMode::Strict => self.check_strict(&key, &policy).await,
        };

        match outcome {
            Ok(decision) => {
                if decision.allowed {
                    debug!(
                        key = %key,
                        remaining = decision.remaining,
                        "Request admitted"
                    );
                } else {
                    warn!(
                        key = %key,
                        limit = decision.limit,
                        retry_after = decision.retry_after,
                        "Rate limit exceeded"
                    );
                }
                decision
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limiter store error, failing open");
                Self::fail_open(&policy)
            }
        }
    }

    /// Report the caller's quota for `tier` without counting anything.
    pub async fn peek(&self, identity: &ClientIdentity, tier: Tier) -> RateLimitDecision {
        let policy = self.policies.policy_for(tier);
        let key = counter_key(policy.tier, &identity.raw_identifier);
        let max = i64::from(policy.max_requests);

        let count = match self.current_count(&key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit status unavailable");
                return RateLimitDecision {
                    allowed: true,
                    limit: policy.max_requests,
                    remaining: policy.max_requests,
                    reset_time: now_epoch_seconds().saturating_add(policy.window_seconds),
                    retry_after: 0,
                    tier: policy.tier,
                    window_seconds: policy.window_seconds,
                };
            }
        };

        let window_left = match self.store.ttl(&key).await {
            Ok(KeyTtl::Expires(secs)) => secs,
            _ => policy.window_seconds,
        };
        let allowed = count < max;

        RateLimitDecision {
            allowed,
            limit: policy.max_requests,
            remaining: (max - count).max(0) as u32,
            reset_time: now_epoch_seconds().saturating_add(window_left),
            retry_after: if allowed { 0 } else { window_left },
            tier: policy.tier,
            window_seconds: policy.window_seconds,
        }
    }

    /// Remove one counter. Returns whether a counter existed.
    pub async fn reset(&self, identifier: &str, tier: Tier) -> Result<bool, StoreError> {
        let key = counter_key(tier, identifier);
        let removed = self.store.del(&key).await?;
        info!(key = %key, removed, "Rate limit counter reset");
        Ok(removed)
    }

    /// Sum live counters per tier. Best effort under key churn.
    pub async fn aggregate(&self) -> Result<RateLimitStats, StoreError> {
        let pattern = format!("{}:*", RATE_LIMIT_KEY_PREFIX);
        let keys = self.store.keys(&pattern).await?;

        let mut stats = RateLimitStats::default();
        for key in keys {
            let Some((tier, _identifier)) = split_counter_key(&key) else {
                continue;
            };
            // Key may have expired since KEYS returned
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let Ok(count) = raw.parse::<u64>() else {
                debug!(key = %key, "Skipping non-counter value during aggregation");
                continue;
            };

            let entry: &mut TierStats = stats.0.entry(tier.to_string()).or_default();
            entry.distinct_identifiers += 1;
            entry.total_requests += count;
        }
        Ok(stats)
    }

    async fn check_lenient(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, StoreError> {
        let max = i64::from(policy.max_requests);
        let count = self.current_count(key).await?;

        if count >= max {
            return Ok(self.denied(key, policy).await);
        }

        let value = self.store.incr(key).await?;
        if value == 1 {
            self.store.expire(key, policy.window_seconds).await?;
        }

        Ok(Self::admitted(policy, (max - count - 1).max(0) as u32))
    }

    async fn check_strict(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, StoreError> {
        let max = i64::from(policy.max_requests);
        let value = self.store.incr(key).await?;
        if value == 1 {
            self.store.expire(key, policy.window_seconds).await?;
        }

        if value > max {
            return Ok(self.denied(key, policy).await);
        }

        Ok(Self::admitted(policy, (max - value).max(0) as u32))
    }

    async fn current_count(&self, key: &str) -> Result<i64, StoreError> {
        match self.store.get(key).await? {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|_| StoreError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        }
    }

    /// Rejection for an exhausted counter. The TTL read is best effort; a
    /// counter left without expiry gets the window TTL again.
    async fn denied(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        let window_left = match self.store.ttl(key).await {
            Ok(KeyTtl::Expires(secs)) => secs,
            Ok(KeyTtl::Persistent) => {
                if let Err(e) = self.store.expire(key, policy.window_seconds).await {
                    debug!(key = %key, error = %e, "Could not restore counter expiry");
                }
                policy.window_seconds
            }
            Ok(KeyTtl::Missing) => policy.window_seconds,
            Err(e) => {
                debug!(key = %key, error = %e, "TTL unavailable, assuming full window");
                policy.window_seconds
            }
        };

        RateLimitDecision {
            allowed: false,
            limit: policy.max_requests,
            remaining: 0,
            reset_time: now_epoch_seconds().saturating_add(window_left),
            retry_after: policy.window_seconds,
            tier: policy.tier,
            window_seconds: policy.window_seconds,
        }
    }

    fn admitted(policy: &RateLimitPolicy, remaining: u32) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            limit: policy.max_requests,
            remaining,
            reset_time: now_epoch_seconds().saturating_add(policy.window_seconds),
            retry_after: 0,
            tier: policy.tier,
            window_seconds: policy.window_seconds,
        }
    }

    fn fail_open(policy: &RateLimitPolicy) -> RateLimitDecision {
        Self::admitted(policy, policy.max_requests.saturating_sub(1))
    }
}

/// Split `rate_limit:<tier>:<identifier>`. The identifier may contain `:`.
fn split_counter_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(RATE_LIMIT_KEY_PREFIX)?.strip_prefix(':')?;
    let (tier, identifier) = rest.split_once(':')?;
    if tier.is_empty() || identifier.is_empty() {
        return None;
    }
    Some((tier, identifier))
}
