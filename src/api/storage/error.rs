//! Counter store error types.

use std::time::Duration;
use thiserror::Error;

/// Shared counter store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store could not be reached (connection refused, reset, closed)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Store did not answer within the configured deadline
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    /// Key holds something that is not a counter
    #[error("Key {key} holds a non-integer value: {value}")]
    InvalidValue { key: String, value: String },
    /// Any other error reported by the store
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}
