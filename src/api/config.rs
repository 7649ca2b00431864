//! Runtime configuration read from environment variables.

use crate::services::policy_table::PolicyTable;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8081;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 50;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Configuration errors detected at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// How the decision engine counts requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountingMode {
    /// Read, compare, then increment. May overshoot under concurrency.
    #[default]
    Lenient,
    /// Increment first, compare the post-increment value.
    Strict,
}

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub redis_url: Option<String>,
    pub store_timeout: Duration,
    pub connect_timeout: Duration,
    pub counting_mode: CountingMode,
    /// Empty means permissive CORS
    pub allowed_origins: Vec<String>,
    pub policies: PolicyTable,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let store_timeout_ms = parse_or(
            "RATE_LIMIT_STORE_TIMEOUT_MS",
            lookup("RATE_LIMIT_STORE_TIMEOUT_MS"),
            DEFAULT_STORE_TIMEOUT_MS,
        )?;
        let connect_timeout_ms = parse_or(
            "REDIS_CONNECT_TIMEOUT_MS",
            lookup("REDIS_CONNECT_TIMEOUT_MS"),
            DEFAULT_CONNECT_TIMEOUT_MS,
        )?;
        let strict = parse_or("RATE_LIMIT_STRICT", lookup("RATE_LIMIT_STRICT"), false)?;

        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port,
            redis_url,
            store_timeout: Duration::from_millis(store_timeout_ms),
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            counting_mode: if strict {
                CountingMode::Strict
            } else {
                CountingMode::Lenient
            },
            allowed_origins,
            policies: PolicyTable::from_lookup(&lookup)?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            redis_url: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            counting_mode: CountingMode::Lenient,
            allowed_origins: Vec::new(),
            policies: PolicyTable::default(),
        }
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
