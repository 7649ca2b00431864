//! Redis / Dragonfly counter store.
//!
//! Every command runs through a shared `ConnectionManager` and is bounded by
//! an explicit deadline, so a slow or absent store turns into a prompt
//! `StoreError` instead of stalling request admission.

use super::traits::{CounterStore, KeyTtl};
use super::StoreError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, FromRedisValue};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the Redis counter store.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Deadline for every individual command
    pub command_timeout: Duration,
    /// Deadline for establishing the initial connection
    pub connect_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(50),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Redis storage backend for distributed rate limiting
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Connect and verify the connection with a PING.
    pub async fn connect(url: &str, config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| {
            warn!("Failed to create Redis client for rate limiting: {}", e);
            StoreError::from(e)
        })?;

        let connection = tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(config.connect_timeout))?
            .map_err(|e| {
                warn!("Failed to create connection manager for rate limiting: {}", e);
                StoreError::from(e)
            })?;

        let store = Self { connection, config };
        store.ping().await?;
        debug!("Connected to Redis for rate limiting");
        Ok(store)
    }

    async fn query<T: FromRedisValue>(&self, cmd: Cmd) -> Result<T, StoreError> {
        let mut conn = self.connection.clone();
        let deadline = self.config.command_timeout;
        match tokio::time::timeout(deadline, cmd.query_async::<T>(&mut conn)).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(deadline)),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(cmd).await
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.query(cmd).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(seconds);
        let set: i64 = self.query(cmd).await?;
        Ok(set == 1)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        let reply: i64 = self.query(cmd).await?;
        Ok(KeyTtl::from_reply(reply))
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: i64 = self.query(cmd).await?;
        Ok(removed > 0)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(pattern);
        self.query(cmd).await
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(seconds);
        let _: String = self.query(cmd).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let reply: String = self.query(redis::cmd("PING")).await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("Unexpected PING reply: {}", reply)))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
