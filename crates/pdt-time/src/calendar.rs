//! Local-day boundary and bucketing helpers.
//!
//! Every stored timestamp is UTC; local dates are derived on read. Charts and
//! daily aggregation work in park-local calendar days, while the "operated
//! today" set is always scoped to the Pacific calendar day regardless of park
//! timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use pdt_core::DomainError;

/// Reference timezone for day-scoped business rules.
pub const PACIFIC: Tz = chrono_tz::America::Los_Angeles;

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns `DomainError::InvalidTimezone` for unknown zone names.
pub fn parse_timezone(name: &str) -> Result<Tz, DomainError> {
    name.parse()
        .map_err(|_| DomainError::InvalidTimezone(name.to_string()))
}

/// UTC instant of local midnight for a date in a zone.
///
/// On DST transition days where midnight is skipped or ambiguous the earliest
/// valid instant is used.
#[must_use]
pub fn local_midnight_utc(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    tz.from_local_datetime(&naive)
        .earliest()
        .map_or_else(
            || {
                // Midnight does not exist (spring-forward); take 01:00
                let fallback = date.and_hms_opt(1, 0, 0).unwrap_or_default();
                tz.from_local_datetime(&fallback)
                    .earliest()
                    .map_or_else(|| Utc.from_utc_datetime(&naive), |dt| dt.with_timezone(&Utc))
            },
            |dt| dt.with_timezone(&Utc),
        )
}

/// UTC boundaries `[start, end)` of one local calendar day in a zone.
#[must_use]
pub fn local_day_range_utc(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight_utc(tz, date);
    let end = local_midnight_utc(tz, date + Duration::days(1));
    (start, end)
}

/// The local calendar date containing a UTC instant.
#[must_use]
pub fn local_date_of(tz: Tz, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// UTC boundaries of the Pacific calendar day containing a UTC instant.
///
/// Used to build the day-scoped "operated today" set during hourly
/// aggregation.
#[must_use]
pub fn pacific_day_range_utc(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = local_date_of(PACIFIC, at);
    local_day_range_utc(PACIFIC, date)
}

/// Truncate a UTC timestamp to its minute bucket.
///
/// Ride and park snapshots from the same cycle may drift by up to two
/// seconds; all joins between them go through this bucket.
#[must_use]
pub fn minute_bucket(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Truncate a UTC timestamp to the start of its hour.
#[must_use]
pub fn hour_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Start of the previous completed hour, the default hourly target.
#[must_use]
pub fn previous_completed_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    hour_start(now) - Duration::hours(1)
}

/// "HH:MM" label in park-local time for chart axes.
#[must_use]
pub fn local_label_hm(tz: Tz, at: DateTime<Utc>) -> String {
    at.with_timezone(&tz).format("%H:%M").to_string()
}

/// Local hour (0-23) of a UTC instant, for hourly chart bucketing.
#[must_use]
pub fn local_hour_of(tz: Tz, at: DateTime<Utc>) -> u32 {
    at.with_timezone(&tz).hour()
}

/// First day of the calendar month containing a date.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("America/Los_Angeles").is_ok());
        assert!(parse_timezone("Europe/Paris").is_ok());
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn test_pacific_day_range_standard_time() {
        // 2025-01-15 10:00 UTC is 02:00 Pacific (PST, UTC-8)
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let (start, end) = pacific_day_range_utc(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 16, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_pacific_day_range_straddles_utc_midnight() {
        // 2025-07-01 03:00 UTC is still 2025-06-30 20:00 Pacific (PDT, UTC-7)
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 3, 0, 0).unwrap();
        let (start, end) = pacific_day_range_utc(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 30, 7, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 7, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_spring_forward_day_is_23_hours() {
        // US DST began 2025-03-09; the Pacific day is 23 hours long
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let (start, end) = local_day_range_utc(PACIFIC, date);
        assert_eq!((end - start).num_hours(), 23);
    }

    #[test]
    fn test_fall_back_day_is_25_hours() {
        // US DST ended 2025-11-02; the Pacific day is 25 hours long
        let date = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        let (start, end) = local_day_range_utc(PACIFIC, date);
        assert_eq!((end - start).num_hours(), 25);
    }

    #[test]
    fn test_minute_bucket_absorbs_drift() {
        let park_at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 30, 0).unwrap();
        let ride_at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 30, 2).unwrap();
        assert_ne!(park_at, ride_at);
        assert_eq!(minute_bucket(park_at), minute_bucket(ride_at));
    }

    #[test]
    fn test_hour_helpers() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 34, 56).unwrap();
        assert_eq!(
            hour_start(at),
            Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            previous_completed_hour(at),
            Utc.with_ymd_and_hms(2025, 5, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_local_label() {
        // 17:30 UTC is 10:30 Pacific in summer
        let at = Utc.with_ymd_and_hms(2025, 7, 1, 17, 30, 0).unwrap();
        assert_eq!(local_label_hm(PACIFIC, at), "10:30");
        assert_eq!(local_hour_of(PACIFIC, at), 10);
    }
}
