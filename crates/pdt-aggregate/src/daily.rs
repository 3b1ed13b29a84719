//! Daily aggregation of one local calendar day.
//!
//! Timezone-aware: iterates the distinct set of active park timezones,
//! converts the local-date boundaries to UTC, and runs a per-timezone pass.
//! Every active park gets a row for the day, zeroed when it never opened, so
//! downstream queries can distinguish "no data" from "zero downtime".

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use pdt_core::{AggregationType, Park, RideId};
use pdt_store::{AggregationLogRepository, ParkRepository, RideRepository, SnapshotRepository};
use pdt_time::{local_day_range_utc, parse_timezone};

use crate::compute::{compute_park_day, compute_ride_day, park_open_timeline, SnapObs};
use crate::error::AggregateError;
use crate::sessions::detect_operating_session;
use crate::store::StatsRepository;

/// Write behavior for the daily pass; the recompute path stamps a different
/// metrics version and can run dry.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub metrics_version: i16,
    pub dry_run: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            metrics_version: 1,
            dry_run: false,
        }
    }
}

/// Result of one daily run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyOutcome {
    pub parks_processed: i32,
    pub rides_processed: i32,
    pub park_errors: u32,
    /// End of the aggregated day in UTC for the last timezone processed
    pub aggregated_until: Option<DateTime<Utc>>,
}

/// Aggregates one local calendar day into daily stats rows.
pub struct DailyAggregator {
    parks: ParkRepository,
    rides: RideRepository,
    snapshots: SnapshotRepository,
    stats: StatsRepository,
    log: AggregationLogRepository,
    interval_minutes: u32,
    stop: Arc<AtomicBool>,
}

impl DailyAggregator {
    /// Create an aggregator over a shared pool.
    #[must_use]
    pub fn new(pool: PgPool, interval_minutes: u32) -> Self {
        Self {
            parks: ParkRepository::new(pool.clone()),
            rides: RideRepository::new(pool.clone()),
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

    /// Run the logged daily aggregation for one local date.
    ///
    /// # Errors
    /// Returns error on environment-level failures; the log row is marked
    /// `failed` with the counts so far preserved.
    pub async fn run(
        &self,
        date: NaiveDate,
        timezone: Option<&str>,
    ) -> Result<DailyOutcome, AggregateError> {
        info!(%date, timezone = timezone.unwrap_or("all"), "Daily aggregation starting");
        let log_id = self
            .log
            .start_or_restart(date, AggregationType::Daily)
            .await?;

        match self
            .aggregate_date(date, timezone, WriteOptions::default())
            .await
        {
            Ok(outcome) => {
                self.log
                    .complete(
                        log_id,
                        outcome.aggregated_until,
                        outcome.parks_processed,
                        outcome.rides_processed,
                    )
                    .await?;
                info!(
                    %date,
                    parks = outcome.parks_processed,
                    rides = outcome.rides_processed,
                    "Daily aggregation complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(%date, error = %e, "Daily aggregation failed");
                let partial = match &e {
                    AggregateError::Cancelled { parks_processed } => *parks_processed,
                    _ => 0,
                };
                self.log.fail(log_id, &e.to_string(), partial, 0).await?;
                Err(e)
            }
        }
    }

    /// Aggregate one date without touching the aggregation log. Shared by the
    /// normal daily run and the recompute path.
    ///
    /// # Errors
    /// Returns error on environment-level failures.
    pub async fn aggregate_date(
        &self,
        date: NaiveDate,
        timezone: Option<&str>,
        options: WriteOptions,
    ) -> Result<DailyOutcome, AggregateError> {
        let timezones = match timezone {
            Some(tz) => vec![tz.to_string()],
            None => self.parks.distinct_active_timezones().await?,
        };

        let mut outcome = DailyOutcome::default();

        for tz_name in &timezones {
            let tz = parse_timezone(tz_name)?;
            let (day_start, day_end) = local_day_range_utc(tz, date);
            let parks = self.parks.get_active_in_timezone(tz_name).await?;
            debug!(timezone = %tz_name, parks = parks.len(), "Timezone pass");

            for park in parks {
                if self.stop.load(Ordering::Relaxed) {
                    return Err(AggregateError::Cancelled {
                        parks_processed: outcome.parks_processed,
                    });
                }

                // A single bad park does not poison the day.
                match self
                    .aggregate_park_day(&park, date, day_start, day_end, options)
                    .await
                {
                    Ok(rides) => {
                        outcome.parks_processed += 1;
                        outcome.rides_processed += rides;
                    }
                    Err(e) => {
                        warn!(park_id = %park.park_id, error = %e, "Park day aggregation failed");
                        outcome.park_errors += 1;
                    }
                }
            }

            outcome.aggregated_until = Some(day_end);
        }

        Ok(outcome)
    }

    async fn aggregate_park_day(
        &self,
        park: &Park,
        date: NaiveDate,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        options: WriteOptions,
    ) -> Result<i32, AggregateError> {
        let semantics = park.operator_semantics();

        let park_snaps = self
            .snapshots
            .park_snapshots_between(park.park_id, day_start, day_end)
            .await?;
        let session =
            detect_operating_session(park.park_id, date, &park_snaps, self.interval_minutes);
        let operating_minutes = session.as_ref().map_or(0, |s| s.operating_minutes);

        if let Some(session) = &session {
            if !options.dry_run {
                self.stats.upsert_operating_session(session).await?;
            }
        }

        let timeline = park_open_timeline(&park_snaps);
        let weights = self.stats.park_weights(park.park_id).await?;

        let ride_snaps = self
            .snapshots
            .ride_snapshots_for_park(park.park_id, day_start, day_end)
            .await?;
        let mut by_ride: BTreeMap<RideId, Vec<SnapObs>> = BTreeMap::new();
        for snapshot in &ride_snaps {
            by_ride
                .entry(snapshot.ride_id)
                .or_default()
                .push(SnapObs::resolve(snapshot, &timeline));
        }

        // Every active ride gets a row, zeroed when it had no snapshots.
        let roster = self.rides.get_active_for_park(park.park_id).await?;
        let mut rides_processed = 0;
        let mut attraction_rows = Vec::new();

        for ride in &roster {
            let observations = by_ride.get(&ride.ride_id).map_or(&[][..], Vec::as_slice);
            let row = compute_ride_day(
                ride.ride_id,
                date,
                observations,
                semantics,
                self.interval_minutes,
                options.metrics_version,
            );
            if options.dry_run {
                debug!(
                    ride_id = %ride.ride_id,
                    downtime = row.downtime_minutes,
                    "Dry run: ride day row not written"
                );
            } else {
                self.stats.upsert_ride_daily(&row).await?;
            }
            rides_processed += 1;
            if weights.contains_key(&ride.ride_id) {
                attraction_rows.push(row);
            }
        }

        let effective_weight = self.stats.effective_park_weight(park.park_id, day_end).await?;
        let park_row = compute_park_day(
            park.park_id,
            date,
            &park_snaps,
            &attraction_rows,
            &weights,
            operating_minutes,
            effective_weight,
            options.metrics_version,
        );
        if options.dry_run {
            debug!(
                park_id = %park.park_id,
                downtime_hours = %park_row.total_downtime_hours,
                "Dry run: park day row not written"
            );
        } else {
            self.stats.upsert_park_daily(&park_row).await?;
        }

        Ok(rides_processed)
    }
}
