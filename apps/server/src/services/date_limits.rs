use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;

/// Wire format of every boundary
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar date of `now` on a wall clock in `tz`
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Adds whole calendar days. Results past chrono's range saturate.
pub fn shift_days(date: NaiveDate, offset_days: i64) -> NaiveDate {
    TimeDelta::try_days(offset_days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if offset_days < 0 {
            NaiveDate::MIN
        } else {
            NaiveDate::MAX
        })
}

/// Today in `tz`, shifted by `offset_days`, as `YYYY-MM-DD`.
///
/// The shift happens on the local calendar date, so DST transitions never
/// move the result.
pub fn compute_boundary(now: DateTime<Utc>, tz: Tz, offset_days: i64) -> String {
    shift_days(local_date(now, tz), offset_days)
        .format(DATE_FORMAT)
        .to_string()
}
