//! Unit tests for configuration parsing
//!
//! Tests environment variable parsing and default values.
//!
//! Note: These tests modify global environment variables and must run serially.

use rollingdates::config::{
    GatewayConfig, QuotaConfig, RetentionConfig, StoreBackend, StoreConfig, TickConfig,
};
use serial_test::serial;
use std::time::Duration;

// =============================================================================
// Quota Config Tests
// =============================================================================

#[test]
#[serial]
fn test_quota_config_defaults() {
    std::env::remove_var("QUOTA_MAX_NEW_CONFIGS_PER_DAY");
    std::env::remove_var("QUOTA_WINDOW_SECS");
    std::env::remove_var("QUOTA_KEY_VERSION");

    let config = QuotaConfig::from_env();

    assert_eq!(config.max_new_configs_per_day, 5);
    assert_eq!(config.window, Duration::from_secs(86_400));
    assert_eq!(config.key_version, "v1");
}

#[test]
#[serial]
fn test_quota_config_custom_values() {
    std::env::set_var("QUOTA_MAX_NEW_CONFIGS_PER_DAY", "10");
    std::env::set_var("QUOTA_WINDOW_SECS", "3600");
    std::env::set_var("QUOTA_KEY_VERSION", "v2");

    let config = QuotaConfig::from_env();

    assert_eq!(config.max_new_configs_per_day, 10);
    assert_eq!(config.window, Duration::from_secs(3600));
    assert_eq!(config.key_version, "v2");

    // Clean up
    std::env::remove_var("QUOTA_MAX_NEW_CONFIGS_PER_DAY");
    std::env::remove_var("QUOTA_WINDOW_SECS");
    std::env::remove_var("QUOTA_KEY_VERSION");
}

#[test]
#[serial]
fn test_quota_config_invalid_values_use_defaults() {
    std::env::set_var("QUOTA_MAX_NEW_CONFIGS_PER_DAY", "lots");

    let config = QuotaConfig::from_env();

    assert_eq!(config.max_new_configs_per_day, 5);

    std::env::remove_var("QUOTA_MAX_NEW_CONFIGS_PER_DAY");
}

// =============================================================================
// Retention and Tick Config Tests
// =============================================================================

#[test]
#[serial]
fn test_retention_config_defaults() {
    std::env::remove_var("METADATA_TTL_SECS");
    std::env::remove_var("DISABLED_CONFIG_TTL_SECS");

    let config = RetentionConfig::from_env();

    assert_eq!(config.metadata_ttl, Duration::from_secs(86_400));
    assert_eq!(config.disabled_config_ttl, Duration::from_secs(3 * 86_400));
}

#[test]
#[serial]
fn test_retention_config_overrides() {
    std::env::set_var("METADATA_TTL_SECS", "7200");
    std::env::set_var("DISABLED_CONFIG_TTL_SECS", "60");

    let config = RetentionConfig::from_env();

    assert_eq!(config.metadata_ttl, Duration::from_secs(7200));
    assert_eq!(config.disabled_config_ttl, Duration::from_secs(60));

    std::env::remove_var("METADATA_TTL_SECS");
    std::env::remove_var("DISABLED_CONFIG_TTL_SECS");
}

#[test]
#[serial]
fn test_tick_config_zero_values_are_clamped() {
    std::env::set_var("TICK_INTERVAL_SECS", "0");
    std::env::set_var("TICK_CONCURRENCY", "0");
    std::env::set_var("TICK_ENABLED", "false");

    let config = TickConfig::from_env();

    assert_eq!(config.interval, Duration::from_secs(1));
    assert_eq!(config.concurrency, 1);
    assert!(!config.enabled);

    std::env::remove_var("TICK_INTERVAL_SECS");
    std::env::remove_var("TICK_CONCURRENCY");
    std::env::remove_var("TICK_ENABLED");
}

// =============================================================================
// Store and Gateway Config Tests
// =============================================================================

#[test]
#[serial]
fn test_memory_backend_needs_no_database_url() {
    std::env::set_var("STORE_BACKEND", "memory");
    std::env::remove_var("DATABASE_URL");

    let config = StoreConfig::from_env().expect("memory backend should load");

    assert_eq!(config.backend, StoreBackend::Memory);
    assert!(config.database.is_none());

    std::env::remove_var("STORE_BACKEND");
}

#[test]
#[serial]
fn test_postgres_backend_requires_database_url() {
    std::env::remove_var("STORE_BACKEND");
    std::env::remove_var("DATABASE_URL");

    assert!(StoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_unknown_backend_rejected() {
    std::env::set_var("STORE_BACKEND", "redis");

    assert!(StoreConfig::from_env().is_err());

    std::env::remove_var("STORE_BACKEND");
}

#[test]
#[serial]
fn test_gateway_base_url_must_be_http() {
    std::env::set_var("FORMS_API_BASE_URL", "ftp://forms.example.com");
    assert!(GatewayConfig::from_env().is_err());

    std::env::set_var("FORMS_API_BASE_URL", "https://forms.example.com/v1");
    let config = GatewayConfig::from_env().expect("https URL should load");
    assert_eq!(config.base_url, "https://forms.example.com/v1");

    std::env::remove_var("FORMS_API_BASE_URL");
}
