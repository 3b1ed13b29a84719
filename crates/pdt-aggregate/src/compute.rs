//! Pure per-entity aggregate computations.
//!
//! Each function maps a slice of observations to one aggregate row. The
//! aggregators, the recompute path, and the audit verifier all call these,
//! so stored and recomputed values come from the same arithmetic.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use pdt_core::rounding::{decimal1, decimal2};
use pdt_core::{
    OperatorSemantics, ParkActivitySnapshot, ParkDailyStats, ParkHourlyStats, ParkId,
    RideDailyStats, RideHourlyStats, RideId, RideStatus, RideStatusSnapshot,
};
use pdt_score::rules;
use pdt_time::minute_bucket;
use rust_decimal::prelude::ToPrimitive;

use crate::timeline::summarize_operating_timeline;

/// One ride snapshot resolved against its cycle's park snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapObs {
    pub at: DateTime<Utc>,
    pub status: Option<RideStatus>,
    pub computed_is_open: bool,
    pub wait_time: Option<i32>,
    /// The park-open decision for this instant, including the live-activity
    /// fallback
    pub park_open: bool,
}

impl SnapObs {
    /// Resolve a stored snapshot against the park-open timeline. The join is
    /// by minute bucket; when the park snapshot for the cycle is missing the
    /// flag stamped at collection time is used.
    #[must_use]
    pub fn resolve(
        snapshot: &RideStatusSnapshot,
        park_open_by_minute: &HashMap<DateTime<Utc>, bool>,
    ) -> Self {
        let park_open = park_open_by_minute
            .get(&minute_bucket(snapshot.recorded_at))
            .copied()
            .unwrap_or(snapshot.park_appears_open);
        Self {
            at: snapshot.recorded_at,
            status: snapshot.status,
            computed_is_open: snapshot.computed_is_open,
            wait_time: snapshot.wait_time,
            park_open,
        }
    }
}

/// Build the minute-bucketed park-open timeline for one day or hour.
#[must_use]
pub fn park_open_timeline(
    park_snapshots: &[ParkActivitySnapshot],
) -> HashMap<DateTime<Utc>, bool> {
    park_snapshots
        .iter()
        .map(|s| (minute_bucket(s.recorded_at), s.effectively_open()))
        .collect()
}

/// Collapse one ride's snapshots for `[hour, hour+1)` into an hourly row.
/// Returns `None` when the ride produced no snapshots this hour.
#[must_use]
pub fn compute_ride_hour(
    ride_id: RideId,
    park_id: ParkId,
    hour_start_utc: DateTime<Utc>,
    observations: &[SnapObs],
    semantics: OperatorSemantics,
    ride_operated: bool,
    interval_minutes: u32,
) -> Option<RideHourlyStats> {
    if observations.is_empty() {
        return None;
    }

    let snapshot_count = observations.len() as i32;
    let operating_snapshots = observations.iter().filter(|o| o.computed_is_open).count() as i32;
    let down_snapshots = observations
        .iter()
        .filter(|o| o.park_open && rules::is_down(semantics, o.status, o.computed_is_open))
        .count() as i32;

    let waits: Vec<i32> = observations
        .iter()
        .filter(|o| o.computed_is_open)
        .filter_map(|o| o.wait_time)
        .collect();
    let avg_wait_time_minutes = if waits.is_empty() {
        None
    } else {
        Some(decimal2(
            waits.iter().map(|w| f64::from(*w)).sum::<f64>() / waits.len() as f64,
        ))
    };

    let downtime_hours = f64::from(down_snapshots) * f64::from(interval_minutes) / 60.0;
    let uptime_percentage =
        100.0 * f64::from(operating_snapshots) / f64::from(snapshot_count);

    Some(RideHourlyStats {
        ride_id,
        park_id,
        hour_start_utc,
        avg_wait_time_minutes,
        operating_snapshots,
        down_snapshots,
        downtime_hours: decimal2(downtime_hours),
        uptime_percentage: decimal2(uptime_percentage),
        snapshot_count,
        ride_operated,
    })
}

/// Collapse one park's hour from its snapshots and its rides' hourly rows.
/// Returns `None` when the park produced no snapshots this hour.
#[must_use]
pub fn compute_park_hour(
    park_id: ParkId,
    hour_start_utc: DateTime<Utc>,
    park_snapshots: &[ParkActivitySnapshot],
    ride_rows: &[RideHourlyStats],
    weights: &HashMap<RideId, i32>,
    effective_park_weight: f64,
) -> Option<ParkHourlyStats> {
    if park_snapshots.is_empty() {
        return None;
    }

    let open: Vec<&ParkActivitySnapshot> = park_snapshots
        .iter()
        .filter(|s| s.effectively_open())
        .collect();

    let shame_score = mean(open.iter().filter_map(|s| {
        s.shame_score.as_ref().and_then(rust_decimal::Decimal::to_f64)
    }))
    .map(decimal1);
    let avg_wait_time_minutes = mean(open.iter().filter_map(|s| {
        s.avg_wait_time.as_ref().and_then(rust_decimal::Decimal::to_f64)
    }))
    .map(decimal2);
    let rides_operating =
        mean(open.iter().map(|s| f64::from(s.rides_open))).map(|v| v.round() as i32);
    let rides_down =
        mean(open.iter().map(|s| f64::from(s.rides_closed))).map(|v| v.round() as i32);

    // Only rides inside the day's operated set accrue park downtime.
    let mut total_downtime_hours = 0.0;
    let mut weighted_downtime_hours = 0.0;
    for row in ride_rows.iter().filter(|r| r.ride_operated) {
        let hours = row.downtime_hours.to_f64().unwrap_or(0.0);
        let weight = weights.get(&row.ride_id).copied().unwrap_or(2);
        total_downtime_hours += hours;
        weighted_downtime_hours += hours * f64::from(weight);
    }

    Some(ParkHourlyStats {
        park_id,
        hour_start_utc,
        shame_score,
        avg_wait_time_minutes,
        rides_operating,
        rides_down,
        total_downtime_hours: decimal2(total_downtime_hours),
        weighted_downtime_hours: decimal2(weighted_downtime_hours),
        effective_park_weight: decimal1(effective_park_weight),
        snapshot_count: park_snapshots.len() as i32,
        park_was_open: !open.is_empty(),
    })
}

/// Collapse one ride's local day into a daily row. Always produces a row,
/// zeroed when the ride has no snapshots, so downstream can distinguish
/// "no data" from "zero downtime".
#[must_use]
pub fn compute_ride_day(
    ride_id: RideId,
    stat_date: NaiveDate,
    observations: &[SnapObs],
    semantics: OperatorSemantics,
    interval_minutes: u32,
    metrics_version: i16,
) -> RideDailyStats {
    let interval = interval_minutes as i32;

    // Operated-today gate: an operating observation while the park is open,
    // or a Disney/Universal DOWN report.
    let ride_operated = observations
        .iter()
        .any(|o| o.park_open && rules::operated_signal(semantics, o.status, o.computed_is_open));

    let uptime_snapshots = observations
        .iter()
        .filter(|o| o.park_open && o.computed_is_open)
        .count() as i32;
    let open_park_snapshots = observations.iter().filter(|o| o.park_open).count() as i32;

    let uptime_minutes = uptime_snapshots * interval;
    let operating_hours_minutes = open_park_snapshots * interval;

    let downtime_minutes = if ride_operated {
        let down = observations
            .iter()
            .filter(|o| o.park_open && rules::is_down(semantics, o.status, o.computed_is_open))
            .count() as i32;
        down * interval
    } else {
        0
    };

    let uptime_percentage = if ride_operated && operating_hours_minutes > 0 {
        100.0 * f64::from(uptime_minutes) / f64::from(operating_hours_minutes)
    } else {
        0.0
    };

    let waits: Vec<i32> = observations
        .iter()
        .filter(|o| o.computed_is_open)
        .filter_map(|o| o.wait_time.filter(|w| *w > 0))
        .collect();
    let avg_wait_time = if waits.is_empty() {
        None
    } else {
        Some(decimal2(
            waits.iter().map(|w| f64::from(*w)).sum::<f64>() / waits.len() as f64,
        ))
    };
    let min_wait_time = waits.iter().min().copied();
    let max_wait_time = waits.iter().max().copied();

    let timeline: Vec<(DateTime<Utc>, bool)> = observations
        .iter()
        .filter(|o| o.park_open)
        .map(|o| (o.at, o.computed_is_open))
        .collect();
    let summary = summarize_operating_timeline(&timeline, interval_minutes);

    RideDailyStats {
        ride_id,
        stat_date,
        uptime_minutes,
        downtime_minutes,
        uptime_percentage: decimal2(uptime_percentage),
        operating_hours_minutes,
        avg_wait_time,
        min_wait_time,
        max_wait_time,
        peak_wait_time: max_wait_time,
        status_changes: summary.status_changes,
        longest_downtime_minutes: summary.longest_downtime_minutes,
        ride_operated,
        metrics_version,
    }
}

/// Collapse one park's local day from its snapshots and its attraction
/// rides' daily rows.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn compute_park_day(
    park_id: ParkId,
    stat_date: NaiveDate,
    park_snapshots: &[ParkActivitySnapshot],
    ride_rows: &[RideDailyStats],
    weights: &HashMap<RideId, i32>,
    operating_minutes: i32,
    effective_park_weight: f64,
    metrics_version: i16,
) -> ParkDailyStats {
    let open: Vec<&ParkActivitySnapshot> = park_snapshots
        .iter()
        .filter(|s| s.effectively_open())
        .collect();

    let shame_score = mean(open.iter().filter_map(|s| {
        s.shame_score.as_ref().and_then(rust_decimal::Decimal::to_f64)
    }))
    .map(decimal1);

    let mut total_downtime_hours = 0.0;
    let mut weighted_downtime_hours = 0.0;
    let mut rides_with_downtime = 0;
    for row in ride_rows {
        let hours = f64::from(row.downtime_minutes) / 60.0;
        if row.downtime_minutes > 0 {
            rides_with_downtime += 1;
        }
        let weight = weights.get(&row.ride_id).copied().unwrap_or(2);
        total_downtime_hours += hours;
        weighted_downtime_hours += hours * f64::from(weight);
    }

    let avg_uptime_percentage = mean(
        ride_rows
            .iter()
            .filter(|r| r.operating_hours_minutes > 0)
            .map(|r| r.uptime_percentage.to_f64().unwrap_or(0.0)),
    )
    .unwrap_or(0.0);

    ParkDailyStats {
        park_id,
        stat_date,
        shame_score,
        total_downtime_hours: decimal2(total_downtime_hours),
        weighted_downtime_hours: decimal2(weighted_downtime_hours),
        avg_uptime_percentage: decimal2(avg_uptime_percentage),
        rides_with_downtime,
        total_rides_tracked: ride_rows.len() as i32,
        operating_hours_minutes: operating_minutes,
        effective_park_weight: decimal1(effective_park_weight),
        metrics_version,
    }
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u32;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / f64::from(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use OperatorSemantics::{DownOnly, DownOrClosed};

    fn hour() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 17, 0, 0).unwrap()
    }

    /// 12 snapshots, 5 minutes apart, from a status pattern.
    fn observations(pattern: &[(Option<RideStatus>, bool)], park_open: bool) -> Vec<SnapObs> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, (status, open))| SnapObs {
                at: hour() + Duration::minutes(5 * i as i64),
                status: *status,
                computed_is_open: *open,
                wait_time: if *open { Some(20) } else { None },
                park_open,
            })
            .collect()
    }

    fn down_half_hour() -> Vec<SnapObs> {
        let operating = (Some(RideStatus::Operating), true);
        let down = (Some(RideStatus::Down), false);
        observations(
            &[
                operating, operating, operating, operating, operating, operating, down, down,
                down, down, down, down,
            ],
            true,
        )
    }

    #[test]
    fn test_ride_hour_counts_and_downtime() {
        let row = compute_ride_hour(
            RideId(1),
            ParkId(1),
            hour(),
            &down_half_hour(),
            DownOnly,
            true,
            5,
        )
        .unwrap();

        assert_eq!(row.snapshot_count, 12);
        assert_eq!(row.operating_snapshots, 6);
        assert_eq!(row.down_snapshots, 6);
        // 6 snapshots x 5 min = 0.5 h
        assert_eq!(row.downtime_hours, decimal2(0.5));
        assert_eq!(row.uptime_percentage, decimal2(50.0));
        // Invariant: down + operating <= count
        assert!(row.down_snapshots + row.operating_snapshots <= row.snapshot_count);
    }

    #[test]
    fn test_ride_hour_empty_is_none() {
        assert!(compute_ride_hour(RideId(1), ParkId(1), hour(), &[], DownOnly, false, 5).is_none());
    }

    #[test]
    fn test_ride_hour_down_needs_open_park() {
        let row = compute_ride_hour(
            RideId(1),
            ParkId(1),
            hour(),
            &observations(&[(Some(RideStatus::Down), false); 6], false),
            DownOnly,
            true,
            5,
        )
        .unwrap();
        assert_eq!(row.down_snapshots, 0);
        assert_eq!(row.downtime_hours, decimal2(0.0));
    }

    #[test]
    fn test_disney_down_all_day_counts_as_operated() {
        // Scenario: a Disney ride reports DOWN the whole day and never
        // OPERATING. DOWN is a valid operating signal there, so the outage
        // counts in full.
        let obs = observations(&[(Some(RideStatus::Down), false); 12], true);
        let row = compute_ride_day(RideId(1), date(), &obs, DownOnly, 5, 1);
        assert!(row.ride_operated);
        assert_eq!(row.downtime_minutes, 60);
        assert_eq!(row.uptime_minutes, 0);
    }

    #[test]
    fn test_non_disney_closed_all_day_is_seasonal() {
        // Scenario: a non-Disney ride reports CLOSED all day and never
        // operates. Treated as seasonal: no downtime at all.
        let obs = observations(&[(Some(RideStatus::Closed), false); 12], true);
        let row = compute_ride_day(RideId(1), date(), &obs, DownOrClosed, 5, 1);
        assert!(!row.ride_operated);
        assert_eq!(row.downtime_minutes, 0);
        assert_eq!(row.uptime_percentage, decimal2(0.0));
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_ride_day_minute_math() {
        let row = compute_ride_day(RideId(1), date(), &down_half_hour(), DownOnly, 5, 1);
        assert!(row.ride_operated);
        assert_eq!(row.uptime_minutes, 30);
        assert_eq!(row.downtime_minutes, 30);
        assert_eq!(row.operating_hours_minutes, 60);
        assert_eq!(row.uptime_percentage, decimal2(50.0));
        assert_eq!(row.status_changes, 1);
        assert_eq!(row.longest_downtime_minutes, Some(30));
    }

    #[test]
    fn test_ride_day_empty_is_zero_row() {
        let row = compute_ride_day(RideId(7), date(), &[], DownOnly, 5, 1);
        assert!(!row.ride_operated);
        assert_eq!(row.uptime_minutes, 0);
        assert_eq!(row.downtime_minutes, 0);
        assert_eq!(row.operating_hours_minutes, 0);
        assert_eq!(row.avg_wait_time, None);
        assert_eq!(row.status_changes, 0);
    }

    #[test]
    fn test_adding_down_snapshot_increases_downtime() {
        // Monotonicity: a new DOWN snapshot for an operated ride strictly
        // increases downtime_minutes.
        let mut obs = down_half_hour();
        let before = compute_ride_day(RideId(1), date(), &obs, DownOnly, 5, 1).downtime_minutes;
        obs.push(SnapObs {
            at: hour() + Duration::minutes(60),
            status: Some(RideStatus::Down),
            computed_is_open: false,
            wait_time: None,
            park_open: true,
        });
        let after = compute_ride_day(RideId(1), date(), &obs, DownOnly, 5, 1).downtime_minutes;
        assert!(after > before);
        assert_eq!(after - before, 5);
    }

    fn park_snap(minute: i64, open: bool, shame: f64, rides_open: i32) -> ParkActivitySnapshot {
        ParkActivitySnapshot {
            snapshot_id: minute,
            park_id: ParkId(1),
            recorded_at: hour() + Duration::minutes(minute),
            total_rides_tracked: 10,
            rides_open,
            rides_closed: 10 - rides_open,
            avg_wait_time: Some(decimal2(25.0)),
            max_wait_time: Some(60),
            park_appears_open: open,
            shame_score: Some(decimal1(shame)),
        }
    }

    #[test]
    fn test_park_hour_averages_stamped_scores() {
        let snaps: Vec<ParkActivitySnapshot> = (0..12)
            .map(|i| park_snap(i * 5, true, if i < 6 { 6.0 } else { 0.0 }, 8))
            .collect();
        let ride_rows = vec![compute_ride_hour(
            RideId(1),
            ParkId(1),
            hour(),
            &down_half_hour(),
            DownOnly,
            true,
            5,
        )
        .unwrap()];
        let weights = HashMap::from([(RideId(1), 3)]);

        let row = compute_park_hour(ParkId(1), hour(), &snaps, &ride_rows, &weights, 5.0).unwrap();
        // Mean of six 6.0s and six 0.0s
        assert_eq!(row.shame_score, Some(decimal1(3.0)));
        assert_eq!(row.total_downtime_hours, decimal2(0.5));
        assert_eq!(row.weighted_downtime_hours, decimal2(1.5));
        assert!(row.park_was_open);
        assert_eq!(row.snapshot_count, 12);
    }

    #[test]
    fn test_park_hour_ignores_rides_that_never_operated() {
        let snaps = vec![park_snap(0, true, 0.0, 5)];
        let mut ride_row = compute_ride_hour(
            RideId(2),
            ParkId(1),
            hour(),
            &observations(&[(Some(RideStatus::Closed), false); 12], true),
            DownOrClosed,
            false,
            5,
        )
        .unwrap();
        ride_row.ride_operated = false;
        let weights = HashMap::from([(RideId(2), 2)]);

        let row =
            compute_park_hour(ParkId(1), hour(), &snaps, &[ride_row], &weights, 2.0).unwrap();
        assert_eq!(row.total_downtime_hours, decimal2(0.0));
        assert_eq!(row.weighted_downtime_hours, decimal2(0.0));
    }

    #[test]
    fn test_park_hour_fallback_open() {
        // Schedule gap: park_appears_open false everywhere but rides_open > 0
        let snaps: Vec<ParkActivitySnapshot> =
            (0..6).map(|i| park_snap(i * 5, false, 2.0, 3)).collect();
        let row =
            compute_park_hour(ParkId(1), hour(), &snaps, &[], &HashMap::new(), 5.0).unwrap();
        assert!(row.park_was_open);
        assert_eq!(row.shame_score, Some(decimal1(2.0)));
    }

    #[test]
    fn test_park_day_rollup() {
        let snaps: Vec<ParkActivitySnapshot> =
            (0..12).map(|i| park_snap(i * 5, true, 3.0, 8)).collect();
        let ride_rows = vec![
            compute_ride_day(RideId(1), date(), &down_half_hour(), DownOnly, 5, 1),
            compute_ride_day(
                RideId(2),
                date(),
                &observations(&[(Some(RideStatus::Operating), true); 12], true),
                DownOnly,
                5,
                1,
            ),
        ];
        let weights = HashMap::from([(RideId(1), 3), (RideId(2), 2)]);

        let row = compute_park_day(
            ParkId(1),
            date(),
            &snaps,
            &ride_rows,
            &weights,
            60,
            5.0,
            1,
        );
        assert_eq!(row.shame_score, Some(decimal1(3.0)));
        assert_eq!(row.total_downtime_hours, decimal2(0.5));
        assert_eq!(row.weighted_downtime_hours, decimal2(1.5));
        assert_eq!(row.rides_with_downtime, 1);
        assert_eq!(row.total_rides_tracked, 2);
        assert_eq!(row.operating_hours_minutes, 60);
        // 50% and 100% uptime
        assert_eq!(row.avg_uptime_percentage, decimal2(75.0));
    }

    #[test]
    fn test_snap_obs_minute_join_tolerates_drift() {
        let park_at = hour();
        let ride_at = hour() + Duration::seconds(2);
        let timeline = HashMap::from([(minute_bucket(park_at), true)]);
        let snapshot = RideStatusSnapshot {
            snapshot_id: 1,
            ride_id: RideId(1),
            recorded_at: ride_at,
            is_open: Some(true),
            status: Some(RideStatus::Operating),
            wait_time: Some(5),
            last_updated_api: ride_at,
            computed_is_open: true,
            // Stamped closed; the park timeline must win through the
            // minute-bucket join
            park_appears_open: false,
        };
        let obs = SnapObs::resolve(&snapshot, &timeline);
        assert!(obs.park_open);
    }
}
