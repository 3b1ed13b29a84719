//! Named query periods and their time windows.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use pdt_time::{local_date_of, local_day_range_utc, PACIFIC};

use crate::error::QueryError;
use crate::types::Granularity;

/// The fixed menu of query periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Most recent ~60 minutes
    Live,
    /// Local midnight to now
    Today,
    /// The previous full local day
    Yesterday,
    /// Trailing 7 local days
    SevenDays,
    /// Trailing 30 local days
    ThirtyDays,
}

impl Period {
    /// Parse the query-string form.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for unknown periods.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "live" => Ok(Self::Live),
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "7days" => Ok(Self::SevenDays),
            "30days" => Ok(Self::ThirtyDays),
            other => Err(QueryError::InvalidParameter {
                name: "period",
                value: other.to_string(),
            }),
        }
    }

    /// Query-string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::SevenDays => "7days",
            Self::ThirtyDays => "30days",
        }
    }

    /// Chart granularity for this period.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        match self {
            Self::Live => Granularity::Minutes,
            Self::Today | Self::Yesterday => Granularity::Hourly,
            Self::SevenDays | Self::ThirtyDays => Granularity::Daily,
        }
    }

    /// UTC window `[start, end)` for snapshot-level reads. Day boundaries are
    /// Pacific by convention.
    #[must_use]
    pub fn window_utc(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = local_date_of(PACIFIC, now);
        match self {
            Self::Live => (now - Duration::minutes(60), now),
            Self::Today => {
                let (start, _) = local_day_range_utc(PACIFIC, today);
                (start, now)
            }
            Self::Yesterday => local_day_range_utc(PACIFIC, today - Duration::days(1)),
            Self::SevenDays => {
                let (start, _) = local_day_range_utc(PACIFIC, today - Duration::days(7));
                (start, now)
            }
            Self::ThirtyDays => {
                let (start, _) = local_day_range_utc(PACIFIC, today - Duration::days(30));
                (start, now)
            }
        }
    }

    /// Inclusive local-date range for aggregate-table reads, `None` for LIVE
    /// and TODAY which never read daily rows.
    #[must_use]
    pub fn date_range(&self, now: DateTime<Utc>) -> Option<(NaiveDate, NaiveDate)> {
        let today = local_date_of(PACIFIC, now);
        match self {
            Self::Live | Self::Today => None,
            Self::Yesterday => {
                let date = today - Duration::days(1);
                Some((date, date))
            }
            Self::SevenDays => Some((today - Duration::days(7), today - Duration::days(1))),
            Self::ThirtyDays => Some((today - Duration::days(30), today - Duration::days(1))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        // 18:30 UTC = 11:30 Pacific on 2025-06-15
        Utc.with_ymd_and_hms(2025, 6, 15, 18, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_round_trip() {
        for name in ["live", "today", "yesterday", "7days", "30days"] {
            assert_eq!(Period::parse(name).unwrap().as_str(), name);
        }
        assert!(Period::parse("fortnight").is_err());
    }

    #[test]
    fn test_live_window_is_sixty_minutes() {
        let (start, end) = Period::Live.window_utc(now());
        assert_eq!(end, now());
        assert_eq!((end - start).num_minutes(), 60);
    }

    #[test]
    fn test_today_starts_at_pacific_midnight() {
        let (start, end) = Period::Today.window_utc(now());
        // Pacific midnight on 2025-06-15 is 07:00 UTC (PDT)
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 15, 7, 0, 0).unwrap());
        assert_eq!(end, now());
    }

    #[test]
    fn test_yesterday_is_full_previous_day() {
        let (start, end) = Period::Yesterday.window_utc(now());
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 14, 7, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 6, 15, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_snapshot_just_before_midnight_is_yesterday() {
        // 06:59 UTC on 6/15 is 23:59 Pacific on 6/14
        let late = Utc.with_ymd_and_hms(2025, 6, 15, 6, 59, 0).unwrap();
        let (start, end) = Period::Yesterday.window_utc(now());
        assert!(late >= start && late < end);
        let (today_start, _) = Period::Today.window_utc(now());
        assert!(late < today_start);
    }

    #[test]
    fn test_date_ranges() {
        let june = |d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap();
        assert_eq!(Period::Yesterday.date_range(now()), Some((june(14), june(14))));
        assert_eq!(Period::SevenDays.date_range(now()), Some((june(8), june(14))));
        assert_eq!(Period::Live.date_range(now()), None);
        assert_eq!(Period::Today.date_range(now()), None);
    }

    #[test]
    fn test_granularity() {
        assert_eq!(Period::Live.granularity(), Granularity::Minutes);
        assert_eq!(Period::Today.granularity(), Granularity::Hourly);
        assert_eq!(Period::ThirtyDays.granularity(), Granularity::Daily);
    }
}
