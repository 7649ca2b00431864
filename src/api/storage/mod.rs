//! Storage module for the API.
//!
//! Provides the shared counter store used by the rate limiter: Redis for
//! distributed deployments, in-memory for single instances and tests.

pub mod error;
pub mod traits;

// Storage backend implementations
pub mod memory;
pub mod redis_store;

pub use error::StoreError;
pub use memory::MemoryCounterStore;
pub use redis_store::{RedisCounterStore, RedisStoreConfig};
pub use traits::{CounterStore, KeyTtl};

use std::sync::Arc;

/// Shared handle to whichever counter store is active
pub type SharedCounterStore = Arc<dyn CounterStore>;
