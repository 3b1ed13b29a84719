//! Aggregate verification: recompute from raw snapshots, compare under
//! tolerance, report.
//!
//! Recomputation goes through the same pure functions as the aggregators
//! (`pdt_aggregate::compute`), so any divergence is a real defect in the
//! stored data, not a second opinion from different arithmetic. Tolerances
//! allow for one snapshot of drift at daily resolution and rounding at
//! hourly resolution.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use tracing::{info, warn};

use pdt_aggregate::compute::{
    compute_park_day, compute_park_hour, compute_ride_day, compute_ride_hour, park_open_timeline,
    SnapObs,
};
use pdt_aggregate::sessions::detect_operating_session;
use pdt_aggregate::StatsRepository;
use pdt_core::{Park, ParkDailyStats, ParkId, RideDailyStats, RideHourlyStats, RideId};
use pdt_score::sql as score_sql;
use pdt_store::{ParkRepository, RideRepository, SnapshotRepository};
use pdt_time::{local_day_range_utc, parse_timezone};

use crate::error::AuditError;
use crate::statistics::median;
use crate::types::{
    AuditSummary, DisneyDownViolation, IntervalConsistencyResult, RowMismatch, Severity,
    TableAuditResult,
};

// Daily tolerances allow one snapshot of drift; hourly tolerances allow
// rounding plus a single misattributed snapshot.
const RIDE_DAILY_TOLERANCE_MINUTES: f64 = 10.0;
const PARK_DAILY_DOWNTIME_TOLERANCE_HOURS: f64 = 0.17;
const PARK_DAILY_RIDES_TOLERANCE: f64 = 1.0;
const RIDE_HOURLY_DOWNTIME_TOLERANCE_HOURS: f64 = 0.1;
const RIDE_HOURLY_UPTIME_TOLERANCE_PCT: f64 = 2.0;
const PARK_HOURLY_SHAME_TOLERANCE: f64 = 0.3;
const PARK_HOURLY_DOWNTIME_TOLERANCE_HOURS: f64 = 0.25;

// Per-table severity thresholds: (mismatches, missing rows).
const RIDE_DAILY_THRESHOLDS: (usize, usize) = (10, 5);
const PARK_DAILY_THRESHOLDS: (usize, usize) = (5, 2);
const RIDE_HOURLY_THRESHOLDS: (usize, usize) = (10, 5);
const PARK_HOURLY_THRESHOLDS: (usize, usize) = (5, 2);

/// Allowed deviation of the empirical median interval from the configured
/// snapshot interval.
const INTERVAL_TOLERANCE_RATIO: f64 = 0.20;

struct DayRecompute {
    ride_rows: HashMap<RideId, RideDailyStats>,
    park_rows: HashMap<ParkId, ParkDailyStats>,
    /// Rides that actually produced snapshots this day; rows must exist for
    /// these.
    rides_with_data: HashSet<RideId>,
    parks_with_data: HashSet<ParkId>,
}

/// Recomputes aggregates from raw snapshots and flags deviations. Read-only:
/// findings are reported, never auto-corrected.
pub struct AggregateVerifier {
    pool: PgPool,
    parks: ParkRepository,
    rides: RideRepository,
    snapshots: SnapshotRepository,
    stats: StatsRepository,
    interval_minutes: u32,
}

impl AggregateVerifier {
    /// Create a verifier over a shared pool.
    #[must_use]
    pub fn new(pool: PgPool, interval_minutes: u32) -> Self {
        Self {
            parks: ParkRepository::new(pool.clone()),
            rides: RideRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            stats: StatsRepository::new(pool.clone()),
            pool,
            interval_minutes,
        }
    }

    /// Full audit of one local date: daily tables, every hour of the Pacific
    /// day, the Disney DOWN coverage check, and interval consistency.
    ///
    /// # Errors
    /// Returns error on environment-level failures only; findings are part
    /// of the summary.
    pub async fn audit_date(&self, target_date: NaiveDate) -> Result<AuditSummary, AuditError> {
        info!(%target_date, "Audit starting");
        let active_parks = self.parks.get_all_active().await?;

        let recomputed = self.recompute_day(&active_parks, target_date).await?;
        let ride_daily = self.verify_ride_daily(target_date, &recomputed).await?;
        let park_daily = self.verify_park_daily(target_date, &recomputed).await?;

        let (ride_hourly, park_hourly) =
            self.verify_hourly(&active_parks, target_date).await?;

        let disney_down_violations = self.verify_disney_down(target_date).await?;
        let interval_results = self
            .verify_interval_consistency(&active_parks, target_date)
            .await?;

        let mut overall_severity = [
            ride_daily.severity,
            park_daily.severity,
            ride_hourly.severity,
            park_hourly.severity,
        ]
        .into_iter()
        .max()
        .unwrap_or(Severity::Info);
        if !disney_down_violations.is_empty()
            || interval_results.iter().any(|r| !r.consistent)
        {
            overall_severity = overall_severity.max(Severity::Warning);
        }

        info!(
            %target_date,
            severity = %overall_severity,
            ride_daily_mismatches = ride_daily.mismatches.len(),
            park_daily_mismatches = park_daily.mismatches.len(),
            disney_violations = disney_down_violations.len(),
            "Audit complete"
        );

        Ok(AuditSummary {
            target_date,
            ride_daily,
            park_daily,
            ride_hourly,
            park_hourly,
            disney_down_violations,
            interval_results,
            overall_severity,
        })
    }

    async fn recompute_day(
        &self,
        active_parks: &[Park],
        target_date: NaiveDate,
    ) -> Result<DayRecompute, AuditError> {
        let mut result = DayRecompute {
            ride_rows: HashMap::new(),
            park_rows: HashMap::new(),
            rides_with_data: HashSet::new(),
            parks_with_data: HashSet::new(),
        };

        for park in active_parks {
            let tz = parse_timezone(&park.timezone)?;
            let (day_start, day_end) = local_day_range_utc(tz, target_date);
            let semantics = park.operator_semantics();

            let park_snaps = self
                .snapshots
                .park_snapshots_between(park.park_id, day_start, day_end)
                .await?;
            let ride_snaps = self
                .snapshots
                .ride_snapshots_for_park(park.park_id, day_start, day_end)
                .await?;
            if park_snaps.is_empty() && ride_snaps.is_empty() {
                continue;
            }
            result.parks_with_data.insert(park.park_id);

            let timeline = park_open_timeline(&park_snaps);
            let weights = self.stats.park_weights(park.park_id).await?;
            let session = detect_operating_session(
                park.park_id,
                target_date,
                &park_snaps,
                self.interval_minutes,
            );
            let operating_minutes = session.map_or(0, |s| s.operating_minutes);

            let mut by_ride: HashMap<RideId, Vec<SnapObs>> = HashMap::new();
            for snapshot in &ride_snaps {
                by_ride
                    .entry(snapshot.ride_id)
                    .or_default()
                    .push(SnapObs::resolve(snapshot, &timeline));
            }

            let roster = self.rides.get_active_for_park(park.park_id).await?;
            let mut attraction_rows = Vec::new();
            for ride in &roster {
                let observations = by_ride.get(&ride.ride_id).map_or(&[][..], Vec::as_slice);
                if !observations.is_empty() {
                    result.rides_with_data.insert(ride.ride_id);
                }
                let row = compute_ride_day(
                    ride.ride_id,
                    target_date,
                    observations,
                    semantics,
                    self.interval_minutes,
                    1,
                );
                if weights.contains_key(&ride.ride_id) {
                    attraction_rows.push(row.clone());
                }
                result.ride_rows.insert(ride.ride_id, row);
            }

            let effective_weight = self
                .stats
                .effective_park_weight(park.park_id, day_end)
                .await?;
            let park_row = compute_park_day(
                park.park_id,
                target_date,
                &park_snaps,
                &attraction_rows,
                &weights,
                operating_minutes,
                effective_weight,
                1,
            );
            result.park_rows.insert(park.park_id, park_row);
        }

        Ok(result)
    }

    async fn verify_ride_daily(
        &self,
        target_date: NaiveDate,
        recomputed: &DayRecompute,
    ) -> Result<TableAuditResult, AuditError> {
        let stored = self.stats.ride_daily_for_date(target_date).await?;
        let stored_ids: HashSet<RideId> = stored.iter().map(|r| r.ride_id).collect();

        let mut mismatches = Vec::new();
        for row in &stored {
            let Some(computed) = recomputed.ride_rows.get(&row.ride_id) else {
                continue;
            };
            for (column, stored_value, computed_value) in [
                (
                    "uptime_minutes",
                    f64::from(row.uptime_minutes),
                    f64::from(computed.uptime_minutes),
                ),
                (
                    "downtime_minutes",
                    f64::from(row.downtime_minutes),
                    f64::from(computed.downtime_minutes),
                ),
                (
                    "operating_hours_minutes",
                    f64::from(row.operating_hours_minutes),
                    f64::from(computed.operating_hours_minutes),
                ),
            ] {
                let delta = (stored_value - computed_value).abs();
                if delta > RIDE_DAILY_TOLERANCE_MINUTES {
                    mismatches.push(RowMismatch {
                        entity_id: row.ride_id.0,
                        key: target_date.to_string(),
                        column,
                        stored: stored_value,
                        computed: computed_value,
                        delta,
                    });
                }
            }
        }

        let missing_rows: Vec<String> = recomputed
            .rides_with_data
            .iter()
            .filter(|id| !stored_ids.contains(id))
            .map(|id| format!("ride {id} {target_date}"))
            .collect();

        Ok(TableAuditResult::graded(
            "ride_daily_stats",
            stored.len(),
            mismatches,
            missing_rows,
            RIDE_DAILY_THRESHOLDS.0,
            RIDE_DAILY_THRESHOLDS.1,
        ))
    }

    async fn verify_park_daily(
        &self,
        target_date: NaiveDate,
        recomputed: &DayRecompute,
    ) -> Result<TableAuditResult, AuditError> {
        let stored = self.stats.park_daily_for_date(target_date).await?;
        let stored_ids: HashSet<ParkId> = stored.iter().map(|r| r.park_id).collect();

        let mut mismatches = Vec::new();
        for row in &stored {
            let Some(computed) = recomputed.park_rows.get(&row.park_id) else {
                continue;
            };
            let stored_downtime = row.total_downtime_hours.to_f64().unwrap_or(0.0);
            let computed_downtime = computed.total_downtime_hours.to_f64().unwrap_or(0.0);
            let delta = (stored_downtime - computed_downtime).abs();
            if delta > PARK_DAILY_DOWNTIME_TOLERANCE_HOURS {
                mismatches.push(RowMismatch {
                    entity_id: row.park_id.0,
                    key: target_date.to_string(),
                    column: "total_downtime_hours",
                    stored: stored_downtime,
                    computed: computed_downtime,
                    delta,
                });
            }
            let rides_delta =
                f64::from((row.rides_with_downtime - computed.rides_with_downtime).abs());
            if rides_delta > PARK_DAILY_RIDES_TOLERANCE {
                mismatches.push(RowMismatch {
                    entity_id: row.park_id.0,
                    key: target_date.to_string(),
                    column: "rides_with_downtime",
                    stored: f64::from(row.rides_with_downtime),
                    computed: f64::from(computed.rides_with_downtime),
                    delta: rides_delta,
                });
            }
        }

        let missing_rows: Vec<String> = recomputed
            .parks_with_data
            .iter()
            .filter(|id| !stored_ids.contains(id))
            .map(|id| format!("park {id} {target_date}"))
            .collect();

        Ok(TableAuditResult::graded(
            "park_daily_stats",
            stored.len(),
            mismatches,
            missing_rows,
            PARK_DAILY_THRESHOLDS.0,
            PARK_DAILY_THRESHOLDS.1,
        ))
    }

    async fn verify_hourly(
        &self,
        active_parks: &[Park],
        target_date: NaiveDate,
    ) -> Result<(TableAuditResult, TableAuditResult), AuditError> {
        let (day_start, day_end) = local_day_range_utc(pdt_time::PACIFIC, target_date);
        let operated_today = self
            .stats
            .rides_operated_between(day_start, day_end)
            .await?;

        let mut ride_mismatches = Vec::new();
        let mut ride_missing = Vec::new();
        let mut ride_rows_checked = 0;
        let mut park_mismatches = Vec::new();
        let mut park_missing = Vec::new();
        let mut park_rows_checked = 0;

        let mut hour = day_start;
        while hour < day_end {
            let hour_end = hour + Duration::hours(1);
            let stored_ride: HashMap<RideId, RideHourlyStats> = self
                .stats
                .ride_hourly_for_hour(hour)
                .await?
                .into_iter()
                .map(|r| (r.ride_id, r))
                .collect();
            let stored_park: HashMap<ParkId, pdt_core::ParkHourlyStats> = self
                .stats
                .park_hourly_for_hour(hour)
                .await?
                .into_iter()
                .map(|r| (r.park_id, r))
                .collect();
            ride_rows_checked += stored_ride.len();
            park_rows_checked += stored_park.len();

            for park in active_parks {
                let semantics = park.operator_semantics();
                let park_snaps = self
                    .snapshots
                    .park_snapshots_between(park.park_id, hour, hour_end)
                    .await?;
                let ride_snaps = self
                    .snapshots
                    .ride_snapshots_for_park(park.park_id, hour, hour_end)
                    .await?;
                if park_snaps.is_empty() && ride_snaps.is_empty() {
                    continue;
                }

                let timeline = park_open_timeline(&park_snaps);
                let weights = self.stats.park_weights(park.park_id).await?;

                let mut by_ride: HashMap<RideId, Vec<SnapObs>> = HashMap::new();
                for snapshot in &ride_snaps {
                    by_ride
                        .entry(snapshot.ride_id)
                        .or_default()
                        .push(SnapObs::resolve(snapshot, &timeline));
                }

                let mut computed_rows = Vec::new();
                for (ride_id, observations) in &by_ride {
                    let Some(computed) = compute_ride_hour(
                        *ride_id,
                        park.park_id,
                        hour,
                        observations,
                        semantics,
                        operated_today.contains(ride_id),
                        self.interval_minutes,
                    ) else {
                        continue;
                    };

                    match stored_ride.get(ride_id) {
                        None => {
                            ride_missing.push(format!("ride {ride_id} {hour}"));
                        }
                        Some(stored) => {
                            compare_ride_hour(stored, &computed, &mut ride_mismatches);
                        }
                    }
                    if weights.contains_key(ride_id) {
                        computed_rows.push(computed);
                    }
                }

                if !park_snaps.is_empty() {
                    let effective_weight = self
                        .stats
                        .effective_park_weight(park.park_id, hour)
                        .await?;
                    if let Some(computed) = compute_park_hour(
                        park.park_id,
                        hour,
                        &park_snaps,
                        &computed_rows,
                        &weights,
                        effective_weight,
                    ) {
                        match stored_park.get(&park.park_id) {
                            None => park_missing.push(format!("park {} {hour}", park.park_id)),
                            Some(stored) => {
                                compare_park_hour(stored, &computed, &mut park_mismatches);
                            }
                        }
                    }
                }
            }

            hour = hour_end;
        }

        let ride_hourly = TableAuditResult::graded(
            "ride_hourly_stats",
            ride_rows_checked,
            ride_mismatches,
            ride_missing,
            RIDE_HOURLY_THRESHOLDS.0,
            RIDE_HOURLY_THRESHOLDS.1,
        );
        let park_hourly = TableAuditResult::graded(
            "park_hourly_stats",
            park_rows_checked,
            park_mismatches,
            park_missing,
            PARK_HOURLY_THRESHOLDS.0,
            PARK_HOURLY_THRESHOLDS.1,
        );
        Ok((ride_hourly, park_hourly))
    }

    /// Every `(ride, hour)` where a Disney/Universal ride reported DOWN with
    /// the park open must appear in the hourly aggregate as operated with
    /// non-zero downtime.
    async fn verify_disney_down(
        &self,
        target_date: NaiveDate,
    ) -> Result<Vec<DisneyDownViolation>, AuditError> {
        let (day_start, day_end) = local_day_range_utc(pdt_time::PACIFIC, target_date);
        let query = format!(
            "SELECT rss.ride_id, date_trunc('hour', rss.recorded_at) AS hour_start \
             FROM ride_status_snapshots rss \
             JOIN rides r ON rss.ride_id = r.ride_id \
             JOIN parks p ON r.park_id = p.park_id \
             JOIN park_activity_snapshots pas ON pas.park_id = p.park_id AND {minute_join} \
             WHERE rss.recorded_at >= $1 AND rss.recorded_at < $2 \
               AND rss.status = 'DOWN' \
               AND {disney} AND {park_open} \
             GROUP BY rss.ride_id, date_trunc('hour', rss.recorded_at)",
            minute_join = score_sql::minute_join("pas", "rss"),
            disney = score_sql::disney_universal("p"),
            park_open = score_sql::park_open("pas"),
        );
        let observed: Vec<(RideId, DateTime<Utc>)> = sqlx::query_as(&query)
            .bind(day_start)
            .bind(day_end)
            .fetch_all(&self.pool)
            .await?;

        let hours: HashSet<DateTime<Utc>> = observed.iter().map(|(_, h)| *h).collect();
        let mut stored: HashMap<(RideId, DateTime<Utc>), RideHourlyStats> = HashMap::new();
        for hour in hours {
            for row in self.stats.ride_hourly_for_hour(hour).await? {
                stored.insert((row.ride_id, hour), row);
            }
        }

        let mut violations = Vec::new();
        for (ride_id, hour) in observed {
            match stored.get(&(ride_id, hour)) {
                None => violations.push(DisneyDownViolation {
                    ride_id: ride_id.0,
                    hour_start_utc: hour,
                    detail: "no hourly row".to_string(),
                }),
                Some(row) if !row.ride_operated => violations.push(DisneyDownViolation {
                    ride_id: ride_id.0,
                    hour_start_utc: hour,
                    detail: "ride_operated is false".to_string(),
                }),
                Some(row) if row.down_snapshots == 0 => violations.push(DisneyDownViolation {
                    ride_id: ride_id.0,
                    hour_start_utc: hour,
                    detail: "zero down_snapshots".to_string(),
                }),
                Some(_) => {}
            }
        }

        if !violations.is_empty() {
            warn!(count = violations.len(), "Disney DOWN coverage violations");
        }
        Ok(violations)
    }

    /// The empirical median interval between consecutive cycle timestamps
    /// must stay within 20% of the configured snapshot interval.
    async fn verify_interval_consistency(
        &self,
        active_parks: &[Park],
        target_date: NaiveDate,
    ) -> Result<Vec<IntervalConsistencyResult>, AuditError> {
        let (day_start, day_end) = local_day_range_utc(pdt_time::PACIFIC, target_date);
        let expected = f64::from(self.interval_minutes);
        let mut results = Vec::new();

        for park in active_parks {
            let timestamps = self
                .snapshots
                .cycle_timestamps(park.park_id, day_start, day_end)
                .await?;
            if timestamps.len() < 2 {
                continue;
            }
            let gaps: Vec<f64> = timestamps
                .windows(2)
                .map(|pair| (pair[1] - pair[0]).num_seconds() as f64 / 60.0)
                .collect();
            let median_minutes = median(&gaps);
            let consistent = median_minutes
                .is_some_and(|m| (m - expected).abs() <= expected * INTERVAL_TOLERANCE_RATIO);
            results.push(IntervalConsistencyResult {
                park_id: park.park_id.0,
                expected_minutes: expected,
                median_minutes,
                consistent,
            });
        }

        Ok(results)
    }
}

fn compare_ride_hour(
    stored: &RideHourlyStats,
    computed: &RideHourlyStats,
    mismatches: &mut Vec<RowMismatch>,
) {
    let key = stored.hour_start_utc.to_string();
    let stored_downtime = stored.downtime_hours.to_f64().unwrap_or(0.0);
    let computed_downtime = computed.downtime_hours.to_f64().unwrap_or(0.0);
    let delta = (stored_downtime - computed_downtime).abs();
    if delta > RIDE_HOURLY_DOWNTIME_TOLERANCE_HOURS {
        mismatches.push(RowMismatch {
            entity_id: stored.ride_id.0,
            key: key.clone(),
            column: "downtime_hours",
            stored: stored_downtime,
            computed: computed_downtime,
            delta,
        });
    }

    let stored_uptime = stored.uptime_percentage.to_f64().unwrap_or(0.0);
    let computed_uptime = computed.uptime_percentage.to_f64().unwrap_or(0.0);
    let delta = (stored_uptime - computed_uptime).abs();
    if delta > RIDE_HOURLY_UPTIME_TOLERANCE_PCT {
        mismatches.push(RowMismatch {
            entity_id: stored.ride_id.0,
            key,
            column: "uptime_percentage",
            stored: stored_uptime,
            computed: computed_uptime,
            delta,
        });
    }
}

fn compare_park_hour(
    stored: &pdt_core::ParkHourlyStats,
    computed: &pdt_core::ParkHourlyStats,
    mismatches: &mut Vec<RowMismatch>,
) {
    let key = stored.hour_start_utc.to_string();
    let stored_shame = stored
        .shame_score
        .as_ref()
        .and_then(ToPrimitive::to_f64)
        .unwrap_or(0.0);
    let computed_shame = computed
        .shame_score
        .as_ref()
        .and_then(ToPrimitive::to_f64)
        .unwrap_or(0.0);
    let delta = (stored_shame - computed_shame).abs();
    if delta > PARK_HOURLY_SHAME_TOLERANCE {
        mismatches.push(RowMismatch {
            entity_id: stored.park_id.0,
            key: key.clone(),
            column: "shame_score",
            stored: stored_shame,
            computed: computed_shame,
            delta,
        });
    }

    let stored_downtime = stored.total_downtime_hours.to_f64().unwrap_or(0.0);
    let computed_downtime = computed.total_downtime_hours.to_f64().unwrap_or(0.0);
    let delta = (stored_downtime - computed_downtime).abs();
    if delta > PARK_HOURLY_DOWNTIME_TOLERANCE_HOURS {
        mismatches.push(RowMismatch {
            entity_id: stored.park_id.0,
            key,
            column: "total_downtime_hours",
            stored: stored_downtime,
            computed: computed_downtime,
            delta,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pdt_core::rounding::{decimal1, decimal2};

    fn ride_hour(downtime: f64, uptime: f64) -> RideHourlyStats {
        RideHourlyStats {
            ride_id: RideId(1),
            park_id: ParkId(1),
            hour_start_utc: Utc.with_ymd_and_hms(2025, 6, 15, 17, 0, 0).unwrap(),
            avg_wait_time_minutes: None,
            operating_snapshots: 6,
            down_snapshots: 6,
            downtime_hours: decimal2(downtime),
            uptime_percentage: decimal2(uptime),
            snapshot_count: 12,
            ride_operated: true,
        }
    }

    #[test]
    fn test_ride_hour_within_tolerance_passes() {
        let mut mismatches = Vec::new();
        // 0.05 h and 1 pp deltas are inside tolerance
        compare_ride_hour(&ride_hour(0.50, 50.0), &ride_hour(0.55, 51.0), &mut mismatches);
        assert!(mismatches.is_empty());
    }

    #[test]
    fn test_ride_hour_beyond_tolerance_flags() {
        let mut mismatches = Vec::new();
        compare_ride_hour(&ride_hour(0.50, 50.0), &ride_hour(0.75, 55.0), &mut mismatches);
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].column, "downtime_hours");
        assert_eq!(mismatches[1].column, "uptime_percentage");
    }

    fn park_hour(shame: f64, downtime: f64) -> pdt_core::ParkHourlyStats {
        pdt_core::ParkHourlyStats {
            park_id: ParkId(1),
            hour_start_utc: Utc.with_ymd_and_hms(2025, 6, 15, 17, 0, 0).unwrap(),
            shame_score: Some(decimal1(shame)),
            avg_wait_time_minutes: None,
            rides_operating: Some(10),
            rides_down: Some(2),
            total_downtime_hours: decimal2(downtime),
            weighted_downtime_hours: decimal2(downtime * 2.0),
            effective_park_weight: decimal1(20.0),
            snapshot_count: 12,
            park_was_open: true,
        }
    }

    #[test]
    fn test_park_hour_shame_tolerance() {
        let mut mismatches = Vec::new();
        compare_park_hour(&park_hour(3.0, 1.0), &park_hour(3.2, 1.1), &mut mismatches);
        assert!(mismatches.is_empty());

        compare_park_hour(&park_hour(3.0, 1.0), &park_hour(3.4, 1.3), &mut mismatches);
        assert_eq!(mismatches.len(), 2);
    }
}
