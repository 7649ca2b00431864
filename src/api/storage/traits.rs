//! Counter store trait definitions.

use super::StoreError;
use async_trait::async_trait;

/// Remaining lifetime of a key, as reported by the store's TTL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires in this many seconds
    Expires(u64),
}

impl KeyTtl {
    /// Map a raw Redis TTL reply (-2 missing, -1 no expiry).
    pub fn from_reply(reply: i64) -> Self {
        match reply {
            -2 => KeyTtl::Missing,
            r if r < 0 => KeyTtl::Persistent,
            r => KeyTtl::Expires(r as u64),
        }
    }
}

/// Shared key-value store backing the rate limit counters.
///
/// Implementations must make `incr` atomic across every process sharing the
/// store; the limiter adds no locking of its own.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// GET: raw value of a key
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// INCR: atomic increment, returns the new value (absent key counts as 0)
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// EXPIRE: set a TTL, returns false if the key does not exist
    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, StoreError>;

    /// TTL: remaining lifetime of a key
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;

    /// DEL: remove a key, returns true if it existed
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// KEYS: best-effort enumeration of keys matching a glob pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// SET ... EX: write a value with a TTL
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError>;

    /// PING: liveness check for health reporting
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
