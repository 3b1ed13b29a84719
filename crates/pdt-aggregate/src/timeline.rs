//! Run-length summary of a ride's boolean operating timeline.
//!
//! Drives `status_changes` and `longest_downtime_minutes` in the daily
//! aggregate.

use chrono::{DateTime, Utc};

/// Summary of one day's operating timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSummary {
    /// Transitions from operating to not-operating
    pub status_changes: i32,
    /// Longest not-operating run that followed an operating observation,
    /// in minutes; `None` when the ride never went down after operating
    pub longest_downtime_minutes: Option<i32>,
}

/// Run-length encode a `(timestamp, operating)` sequence.
///
/// Points must be time-ordered. A leading closed run (the ride had not opened
/// yet) is not a breakdown and is ignored; only closed runs that follow an
/// operating observation count as downtime runs.
#[must_use]
pub fn summarize_operating_timeline(
    points: &[(DateTime<Utc>, bool)],
    interval_minutes: u32,
) -> TimelineSummary {
    let mut status_changes = 0;
    let mut longest: Option<i32> = None;

    let mut seen_operating = false;
    let mut previous_operating: Option<bool> = None;
    let mut current_run: i32 = 0;

    for (_, operating) in points {
        if *operating {
            seen_operating = true;
            current_run = 0;
        } else {
            if previous_operating == Some(true) {
                status_changes += 1;
            }
            if seen_operating {
                current_run += interval_minutes as i32;
                longest = Some(longest.map_or(current_run, |l| l.max(current_run)));
            }
        }
        previous_operating = Some(*operating);
    }

    TimelineSummary {
        status_changes,
        longest_downtime_minutes: longest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn points(pattern: &[bool]) -> Vec<(DateTime<Utc>, bool)> {
        let start = Utc.with_ymd_and_hms(2025, 6, 15, 16, 0, 0).unwrap();
        pattern
            .iter()
            .enumerate()
            .map(|(i, open)| (start + Duration::minutes(5 * i as i64), *open))
            .collect()
    }

    #[test]
    fn test_steady_operation_has_no_changes() {
        let summary = summarize_operating_timeline(&points(&[true; 8]), 5);
        assert_eq!(summary.status_changes, 0);
        assert_eq!(summary.longest_downtime_minutes, None);
    }

    #[test]
    fn test_single_breakdown() {
        // Open, then down for 3 intervals, then back up
        let summary =
            summarize_operating_timeline(&points(&[true, false, false, false, true]), 5);
        assert_eq!(summary.status_changes, 1);
        assert_eq!(summary.longest_downtime_minutes, Some(15));
    }

    #[test]
    fn test_two_breakdowns_takes_longest() {
        let summary = summarize_operating_timeline(
            &points(&[true, false, true, false, false, false, true]),
            5,
        );
        assert_eq!(summary.status_changes, 2);
        assert_eq!(summary.longest_downtime_minutes, Some(15));
    }

    #[test]
    fn test_leading_closed_run_is_not_downtime() {
        // Park not open yet: closed, closed, then operating all day
        let summary = summarize_operating_timeline(&points(&[false, false, true, true]), 5);
        assert_eq!(summary.status_changes, 0);
        assert_eq!(summary.longest_downtime_minutes, None);
    }

    #[test]
    fn test_never_operated() {
        let summary = summarize_operating_timeline(&points(&[false; 6]), 5);
        assert_eq!(summary.status_changes, 0);
        assert_eq!(summary.longest_downtime_minutes, None);
    }

    #[test]
    fn test_breakdown_running_to_close() {
        // Goes down mid-day and never recovers
        let summary = summarize_operating_timeline(&points(&[true, true, false, false]), 10);
        assert_eq!(summary.status_changes, 1);
        assert_eq!(summary.longest_downtime_minutes, Some(20));
    }

    #[test]
    fn test_empty_timeline() {
        let summary = summarize_operating_timeline(&[], 5);
        assert_eq!(summary.status_changes, 0);
        assert_eq!(summary.longest_downtime_minutes, None);
    }
}
