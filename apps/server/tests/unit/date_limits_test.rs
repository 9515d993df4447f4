//! Unit tests for date boundary computation
//!
//! Tests local-calendar arithmetic across timezones, rollovers and DST.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use rollingdates::services::date_limits::{compute_boundary, local_date, DATE_FORMAT};
use rstest::rstest;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_new_york_thirty_day_window() {
    // 11:00 EDT on 2024-03-10, the morning DST started
    let now = utc(2024, 3, 10, 15, 0);
    let tz = chrono_tz::America::New_York;

    assert_eq!(compute_boundary(now, tz, -30), "2024-02-09");
    assert_eq!(compute_boundary(now, tz, 0), "2024-03-10");
}

#[test]
fn test_same_inputs_same_output() {
    let now = utc(2024, 7, 4, 9, 30);
    let tz = chrono_tz::Europe::Berlin;

    assert_eq!(compute_boundary(now, tz, 12), compute_boundary(now, tz, 12));
}

#[test]
fn test_local_date_ignores_utc_date() {
    // Already tomorrow in Tokyo, still yesterday in Honolulu
    let now = utc(2024, 12, 31, 15, 30);

    assert_eq!(
        local_date(now, chrono_tz::Asia::Tokyo),
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
    assert_eq!(
        local_date(now, chrono_tz::Pacific::Honolulu),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    );
}

// =============================================================================
// Rollover and DST Cases
// =============================================================================

#[rstest]
#[case::year_rollover(utc(2024, 12, 31, 23, 30), chrono_tz::UTC, 1, "2025-01-01")]
#[case::tokyo_new_year(utc(2024, 12, 31, 15, 30), chrono_tz::Asia::Tokyo, 0, "2025-01-01")]
#[case::honolulu_still_old_year(utc(2025, 1, 1, 5, 0), chrono_tz::Pacific::Honolulu, 0, "2024-12-31")]
#[case::leap_day_forward(utc(2024, 2, 28, 12, 0), chrono_tz::UTC, 1, "2024-02-29")]
#[case::non_leap_forward(utc(2023, 2, 28, 12, 0), chrono_tz::UTC, 1, "2023-03-01")]
#[case::leap_day_backward(utc(2024, 3, 1, 12, 0), chrono_tz::UTC, -1, "2024-02-29")]
#[case::month_rollover_backward(utc(2024, 5, 1, 8, 0), chrono_tz::Europe::Paris, -1, "2024-04-30")]
#[case::london_autumn_dst(utc(2024, 10, 26, 23, 30), chrono_tz::Europe::London, 1, "2024-10-28")]
#[case::sydney_dst_end(utc(2024, 4, 6, 14, 30), chrono_tz::Australia::Sydney, 0, "2024-04-07")]
#[case::new_york_before_spring_forward(utc(2024, 3, 10, 6, 59), chrono_tz::America::New_York, -1, "2024-03-09")]
#[case::kiritimati_ahead(utc(2024, 6, 30, 10, 0), chrono_tz::Pacific::Kiritimati, 0, "2024-07-01")]
#[case::one_year_ahead(utc(2024, 3, 10, 12, 0), chrono_tz::UTC, 365, "2025-03-10")]
fn test_boundary_cases(
    #[case] now: DateTime<Utc>,
    #[case] tz: Tz,
    #[case] offset: i64,
    #[case] expected: &str,
) {
    assert_eq!(compute_boundary(now, tz, offset), expected);
}

// =============================================================================
// Property Tests
// =============================================================================

const ZONES: &[Tz] = &[
    chrono_tz::UTC,
    chrono_tz::America::New_York,
    chrono_tz::America::Los_Angeles,
    chrono_tz::America::Sao_Paulo,
    chrono_tz::Europe::London,
    chrono_tz::Europe::Berlin,
    chrono_tz::Asia::Kolkata,
    chrono_tz::Asia::Kathmandu,
    chrono_tz::Asia::Tokyo,
    chrono_tz::Australia::Lord_Howe,
    chrono_tz::Pacific::Chatham,
    chrono_tz::Pacific::Kiritimati,
    chrono_tz::Pacific::Pago_Pago,
];

proptest! {
    #[test]
    fn prop_boundary_is_local_date_plus_offset(
        secs in 0i64..4_102_444_800,
        zone in 0usize..ZONES.len(),
        offset in -3650i64..=3650,
    ) {
        let now = DateTime::from_timestamp(secs, 0).unwrap();
        let tz = ZONES[zone];

        let boundary = compute_boundary(now, tz, offset);
        let parsed = NaiveDate::parse_from_str(&boundary, DATE_FORMAT).unwrap();
        let today = now.with_timezone(&tz).date_naive();

        prop_assert_eq!(parsed, today + TimeDelta::days(offset));
        prop_assert_eq!((parsed - today).num_days(), offset);
    }

    #[test]
    fn prop_boundary_always_formatted_as_iso_date(
        secs in 0i64..4_102_444_800,
        zone in 0usize..ZONES.len(),
        offset in -36_500i64..=36_500,
    ) {
        let now = DateTime::from_timestamp(secs, 0).unwrap();
        let boundary = compute_boundary(now, ZONES[zone], offset);

        prop_assert_eq!(boundary.len(), 10);
        prop_assert_eq!(&boundary[4..5], "-");
        prop_assert_eq!(&boundary[7..8], "-");
    }
}
