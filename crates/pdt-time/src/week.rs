//! ISO-week math for the weekly rollup and its trend calculation.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Monday of a given ISO week, or `None` for an invalid week number.
#[must_use]
pub fn iso_week_start(year: i32, week: u32) -> Option<NaiveDate> {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// Sunday of a given ISO week.
#[must_use]
pub fn iso_week_end(year: i32, week: u32) -> Option<NaiveDate> {
    iso_week_start(year, week).map(|monday| monday + Duration::days(6))
}

/// The ISO `(year, week)` containing a date.
#[must_use]
pub fn iso_week_of(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

/// The ISO week preceding `(year, week)`.
///
/// Week 1 wraps to week 52 or 53 of the prior year; December 28 is always in
/// the last ISO week of its year.
#[must_use]
pub fn previous_iso_week(year: i32, week: u32) -> (i32, u32) {
    if week <= 1 {
        let dec28 = NaiveDate::from_ymd_opt(year - 1, 12, 28)
            .map_or(52, |d| d.iso_week().week());
        (year - 1, dec28)
    } else {
        (year, week - 1)
    }
}

/// The calendar month preceding `(year, month)`.
#[must_use]
pub const fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_week_start() {
        // 2025-W01 starts Monday 2024-12-30
        assert_eq!(
            iso_week_start(2025, 1),
            NaiveDate::from_ymd_opt(2024, 12, 30)
        );
        assert_eq!(
            iso_week_end(2025, 1),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(iso_week_start(2025, 60), None);
    }

    #[test]
    fn test_previous_week_mid_year() {
        assert_eq!(previous_iso_week(2025, 20), (2025, 19));
    }

    #[test]
    fn test_week_one_wraps_to_53() {
        // 2020 had 53 ISO weeks
        assert_eq!(previous_iso_week(2021, 1), (2020, 53));
    }

    #[test]
    fn test_week_one_wraps_to_52() {
        // 2021 had 52 ISO weeks
        assert_eq!(previous_iso_week(2022, 1), (2021, 52));
    }

    #[test]
    fn test_iso_week_of_year_boundary() {
        // 2024-12-30 belongs to 2025-W01
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(iso_week_of(date), (2025, 1));
    }

    #[test]
    fn test_previous_month() {
        assert_eq!(previous_month(2025, 3), (2025, 2));
        assert_eq!(previous_month(2025, 1), (2024, 12));
    }
}
