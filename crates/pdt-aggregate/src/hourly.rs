//! Hourly aggregation of the previous completed hour.
//!
//! Invoked at :05 past each hour for `[H, H+1)`. Idempotent: a rerun for an
//! hour that already succeeded is skipped, and reruns that do execute
//! converge to the same rows through the natural-key upserts.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{error, info, warn};

use pdt_core::{AggregationType, Park, RideId, RideStatusSnapshot};
use pdt_store::{AggregationLogRepository, ParkRepository, SnapshotRepository};
use pdt_time::{hour_start, pacific_day_range_utc, previous_completed_hour};

use crate::compute::{compute_park_hour, compute_ride_hour, park_open_timeline, SnapObs};
use crate::error::AggregateError;
use crate::store::StatsRepository;

/// Result of one hourly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourlyOutcome {
    /// The hour already had a successful run
    Skipped,
    /// Aggregation completed
    Completed {
        parks_processed: i32,
        rides_processed: i32,
        ride_errors: u32,
    },
}

/// Aggregates one UTC hour of snapshots into hourly stats rows.
pub struct HourlyAggregator {
    parks: ParkRepository,
    snapshots: SnapshotRepository,
    stats: StatsRepository,
    log: AggregationLogRepository,
    interval_minutes: u32,
    stop: Arc<AtomicBool>,
}

impl HourlyAggregator {
    /// Create an aggregator over a shared pool.
    #[must_use]
    pub fn new(pool: PgPool, interval_minutes: u32) -> Self {
        Self {
            parks: ParkRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            stats: StatsRepository::new(pool.clone()),
            log: AggregationLogRepository::new(pool),
            interval_minutes,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop flag honored between per-park iterations.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run hourly aggregation for `target_hour` (default: the previous
    /// completed hour relative to `now`).
    ///
    /// # Errors
    /// Returns error on environment-level failures; the log row is marked
    /// `failed` with the message first.
    pub async fn run(
        &self,
        target_hour: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<HourlyOutcome, AggregateError> {
        let target = target_hour.map_or_else(|| previous_completed_hour(now), hour_start);
        let hour_end = target + Duration::hours(1);

        if self.log.hourly_already_succeeded(target).await? {
            info!(hour = %target, "Hourly aggregation already completed; skipping");
            return Ok(HourlyOutcome::Skipped);
        }

        let log_id = self
            .log
            .start(target.date_naive(), AggregationType::Hourly, Some(hour_end))
            .await?;
        info!(hour = %target, log_id, "Hourly aggregation starting");

        match self.aggregate_hour(target, hour_end).await {
            Ok((parks_processed, rides_processed, ride_errors)) => {
                self.log
                    .complete(log_id, Some(hour_end), parks_processed, rides_processed)
                    .await?;
                info!(
                    hour = %target,
                    parks_processed,
                    rides_processed,
                    ride_errors,
                    "Hourly aggregation complete"
                );
                Ok(HourlyOutcome::Completed {
                    parks_processed,
                    rides_processed,
                    ride_errors,
                })
            }
            Err(e) => {
                error!(hour = %target, error = %e, "Hourly aggregation failed");
                self.log.fail(log_id, &e.to_string(), 0, 0).await?;
                Err(e)
            }
        }
    }

    async fn aggregate_hour(
        &self,
        target: DateTime<Utc>,
        hour_end: DateTime<Utc>,
    ) -> Result<(i32, i32, u32), AggregateError> {
        // Day-scoped "operated today" set, computed once for all rides so a
        // multi-hour outage stays counted in every hour after the breakdown.
        let (day_start, day_end) = pacific_day_range_utc(target);
        let operated_today = self.stats.rides_operated_between(day_start, day_end).await?;
        info!(operated = operated_today.len(), "Pre-computed operated-today set");

        let parks = self.parks.get_all_active().await?;

        let mut parks_processed = 0;
        let mut rides_processed = 0;
        let mut ride_errors = 0u32;

        for park in parks {
            if self.stop.load(Ordering::Relaxed) {
                return Err(AggregateError::Cancelled { parks_processed });
            }

            let park_snaps = self
                .snapshots
                .park_snapshots_between(park.park_id, target, hour_end)
                .await?;
            let ride_snaps = self
                .snapshots
                .ride_snapshots_for_park(park.park_id, target, hour_end)
                .await?;
            if park_snaps.is_empty() && ride_snaps.is_empty() {
                continue;
            }

            let (park_rides, ride_err) = self
                .aggregate_park_hour(&park, target, &park_snaps, ride_snaps, &operated_today)
                .await?;
            rides_processed += park_rides;
            ride_errors += ride_err;
            if !park_snaps.is_empty() {
                parks_processed += 1;
            }
        }

        Ok((parks_processed, rides_processed, ride_errors))
    }

    async fn aggregate_park_hour(
        &self,
        park: &Park,
        target: DateTime<Utc>,
        park_snaps: &[pdt_core::ParkActivitySnapshot],
        ride_snaps: Vec<RideStatusSnapshot>,
        operated_today: &std::collections::HashSet<RideId>,
    ) -> Result<(i32, u32), AggregateError> {
        let semantics = park.operator_semantics();
        let timeline = park_open_timeline(park_snaps);
        let weights = self.stats.park_weights(park.park_id).await?;

        let mut by_ride: BTreeMap<RideId, Vec<SnapObs>> = BTreeMap::new();
        for snapshot in &ride_snaps {
            by_ride
                .entry(snapshot.ride_id)
                .or_default()
                .push(SnapObs::resolve(snapshot, &timeline));
        }

        let mut rides_processed = 0;
        let mut ride_errors = 0u32;
        let mut ride_rows = Vec::new();

        for (ride_id, observations) in by_ride {
            let Some(row) = compute_ride_hour(
                ride_id,
                park.park_id,
                target,
                &observations,
                semantics,
                operated_today.contains(&ride_id),
                self.interval_minutes,
            ) else {
                continue;
            };

            // Per-ride errors are counted but do not abort the hour.
            match self.stats.upsert_ride_hourly(&row).await {
                Ok(()) => {
                    rides_processed += 1;
                    // Only attractions feed the park roll-up.
                    if weights.contains_key(&ride_id) {
                        ride_rows.push(row);
                    }
                }
                Err(e) => {
                    warn!(ride_id = %ride_id, error = %e, "Ride hour upsert failed");
                    ride_errors += 1;
                }
            }
        }

        if !park_snaps.is_empty() {
            let effective_weight = self.stats.effective_park_weight(park.park_id, target).await?;
            if let Some(park_row) = compute_park_hour(
                park.park_id,
                target,
                park_snaps,
                &ride_rows,
                &weights,
                effective_weight,
            ) {
                self.stats.upsert_park_hourly(&park_row).await?;
            }
        }

        Ok((rides_processed, ride_errors))
    }
}
