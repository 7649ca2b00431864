//! Configuration read from the process environment.
//!
//! These tests mutate environment variables and run serially.

use accuread_api::config::{ConfigError, CountingMode, Settings};
use accuread_api::models::Tier;
use accuread_api::services::jwt_service::JwtService;
use accuread_api::services::policy_table::PolicyTable;
use serial_test::serial;

const VARS: &[&str] = &[
    "PORT",
    "REDIS_URL",
    "RATE_LIMIT_STRICT",
    "RATE_LIMIT_STORE_TIMEOUT_MS",
    "ALLOWED_ORIGINS",
    "RATE_LIMIT_AUTH_REQUESTS",
    "RATE_LIMIT_AUTH_WINDOW_SECS",
    "RATE_LIMIT_OCR_REQUESTS",
    "JWT_SECRET",
    "APP_ENV",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: tests in this file are serialized and spawn no threads
        unsafe { std::env::remove_var(var) };
    }
}

fn set_env(name: &str, value: &str) {
    // SAFETY: see clear_env
    unsafe { std::env::set_var(name, value) };
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let settings = Settings::from_env().unwrap();
    assert_eq!(settings.port, 8081);
    assert!(settings.redis_url.is_none());
    assert_eq!(settings.counting_mode, CountingMode::Lenient);
    assert_eq!(settings.policies, PolicyTable::default());
}

#[test]
#[serial]
fn test_policy_overrides_from_environment() {
    clear_env();
    set_env("RATE_LIMIT_AUTH_REQUESTS", "10");
    set_env("RATE_LIMIT_AUTH_WINDOW_SECS", "600");
    set_env("RATE_LIMIT_OCR_REQUESTS", "45");

    let table = PolicyTable::from_env().unwrap();
    let auth = table.policy_for(Tier::Auth);
    assert_eq!((auth.max_requests, auth.window_seconds), (10, 600));
    assert_eq!(table.policy_for(Tier::Ocr).max_requests, 45);
    assert_eq!(table.policy_for(Tier::Export).max_requests, 3);
    clear_env();
}

#[test]
#[serial]
fn test_zero_limit_fails_startup() {
    clear_env();
    set_env("RATE_LIMIT_AUTH_REQUESTS", "0");

    let err = Settings::from_env().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue { ref name, .. } if name == "RATE_LIMIT_AUTH_REQUESTS"
    ));
    clear_env();
}

#[test]
#[serial]
fn test_strict_mode_and_origins() {
    clear_env();
    set_env("RATE_LIMIT_STRICT", "true");
    set_env("ALLOWED_ORIGINS", "https://accuread.example.com");
    set_env("REDIS_URL", "redis://127.0.0.1:6379");

    let settings = Settings::from_env().unwrap();
    assert_eq!(settings.counting_mode, CountingMode::Strict);
    assert_eq!(settings.allowed_origins, vec!["https://accuread.example.com"]);
    assert_eq!(settings.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    clear_env();
}

#[test]
#[serial]
fn test_jwt_secret_required_outside_development() {
    clear_env();
    assert!(JwtService::try_from_env().is_err());

    set_env("JWT_SECRET", "short");
    assert!(JwtService::try_from_env().is_err());

    set_env("APP_ENV", "development");
    assert!(JwtService::try_from_env().is_ok());

    clear_env();
    set_env("JWT_SECRET", "a-production-secret-with-enough-length-42");
    assert!(JwtService::try_from_env().is_ok());
    clear_env();
}
