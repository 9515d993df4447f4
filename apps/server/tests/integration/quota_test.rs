//! Integration tests for the new-configuration quota

use chrono::{TimeDelta, TimeZone, Utc};
use futures_util::future::join_all;
use rollingdates::config::QuotaConfig;
use rollingdates::services::QuotaService;

use crate::common::TestEnv;

fn env() -> TestEnv {
    TestEnv::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
}

#[tokio::test]
async fn test_sixth_reservation_is_rejected() {
    let env = env();
    let quota = QuotaConfig::default();

    for _ in 0..5 {
        assert!(QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
            .await
            .unwrap());
    }

    assert!(!QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap());
    assert_eq!(
        QuotaService::count(env.store.as_ref(), &quota, "10.0.0.1")
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn test_check_only_never_consumes() {
    let env = env();
    let quota = QuotaConfig::default();

    for _ in 0..10 {
        assert!(QuotaService::check_only(env.store.as_ref(), &quota, "10.0.0.1")
            .await
            .unwrap());
    }

    assert_eq!(
        QuotaService::count(env.store.as_ref(), &quota, "10.0.0.1")
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_check_only_reports_exhaustion() {
    let env = env();
    let quota = QuotaConfig {
        max_new_configs_per_day: 1,
        ..QuotaConfig::default()
    };

    QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap();

    assert!(!QuotaService::check_only(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_identities_are_counted_separately() {
    let env = env();
    let quota = QuotaConfig {
        max_new_configs_per_day: 1,
        ..QuotaConfig::default()
    };

    assert!(QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap());
    assert!(QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.2")
        .await
        .unwrap());
    assert!(!QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_key_version_bump_resets_counters() {
    let env = env();
    let v1 = QuotaConfig {
        max_new_configs_per_day: 1,
        ..QuotaConfig::default()
    };
    let v2 = QuotaConfig {
        key_version: "v2".to_string(),
        ..v1.clone()
    };

    QuotaService::try_reserve(env.store.as_ref(), &v1, "10.0.0.1")
        .await
        .unwrap();

    assert!(QuotaService::try_reserve(env.store.as_ref(), &v2, "10.0.0.1")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_window_expiry_restores_quota() {
    let env = env();
    let quota = QuotaConfig {
        max_new_configs_per_day: 1,
        ..QuotaConfig::default()
    };

    QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap();

    env.clock.advance(TimeDelta::hours(23));
    assert!(!QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap());

    env.clock.advance(TimeDelta::hours(1));
    assert!(QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_concurrent_reservations_never_overshoot() {
    let env = env();
    let quota = QuotaConfig::default();

    let attempts = (0..20).map(|_| QuotaService::try_reserve(env.store.as_ref(), &quota, "10.0.0.1"));
    let results = join_all(attempts).await;

    let granted = results.into_iter().filter(|r| matches!(r, Ok(true))).count();
    assert_eq!(granted, 5);
    assert_eq!(
        QuotaService::count(env.store.as_ref(), &quota, "10.0.0.1")
            .await
            .unwrap(),
        5
    );
}
