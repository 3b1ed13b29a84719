//! Repository for the raw snapshot stream.
//!
//! Writes are append-only; duplicates on the natural key are rejected, never
//! updated. Range reads serve the aggregators and the raw-path queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use pdt_core::{
    NewParkActivitySnapshot, NewRideStatusSnapshot, ParkActivitySnapshot, ParkId,
    RideStatusSnapshot, RideId,
};

use crate::error::StoreError;

const RIDE_SNAPSHOT_COLUMNS: &str = "snapshot_id, ride_id, recorded_at, is_open, status, \
     wait_time, last_updated_api, computed_is_open, park_appears_open";

const PARK_SNAPSHOT_COLUMNS: &str = "snapshot_id, park_id, recorded_at, total_rides_tracked, \
     rides_open, rides_closed, avg_wait_time, max_wait_time, park_appears_open, shame_score";

/// Outcome of one per-park cycle write.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleWrite {
    /// Ride snapshots inserted
    pub rides_written: u64,
    /// Ride snapshots rejected as duplicates on `(ride, recorded_at)`
    pub duplicates_rejected: u64,
    /// Whether the park snapshot row was inserted
    pub park_written: bool,
}

/// Repository for snapshot reads and the collector's writes.
pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write one park's collection cycle atomically: the park snapshot and
    /// all of its ride snapshots commit together or not at all, so readers
    /// never see a ride snapshot without its sibling park snapshot.
    ///
    /// # Errors
    /// Returns error if the transaction fails; nothing is written.
    pub async fn record_cycle(
        &self,
        park: &NewParkActivitySnapshot,
        rides: &[NewRideStatusSnapshot],
    ) -> Result<CycleWrite, StoreError> {
        let mut tx = self.pool.begin().await?;

        let park_written = sqlx::query(
            r"
            INSERT INTO park_activity_snapshots (
                park_id, recorded_at, total_rides_tracked, rides_open, rides_closed,
                avg_wait_time, max_wait_time, park_appears_open, shame_score
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (park_id, recorded_at) DO NOTHING
            ",
        )
        .bind(park.park_id)
        .bind(park.recorded_at)
        .bind(park.total_rides_tracked)
        .bind(park.rides_open)
        .bind(park.rides_closed)
        .bind(park.avg_wait_time)
        .bind(park.max_wait_time)
        .bind(park.park_appears_open)
        .bind(park.shame_score)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let mut written = 0u64;
        for ride in rides {
            let affected = sqlx::query(
                r"
                INSERT INTO ride_status_snapshots (
                    ride_id, recorded_at, is_open, status, wait_time,
                    last_updated_api, computed_is_open, park_appears_open
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (ride_id, recorded_at) DO NOTHING
                ",
            )
            .bind(ride.ride_id)
            .bind(ride.recorded_at)
            .bind(ride.is_open)
            .bind(ride.status)
            .bind(ride.wait_time)
            .bind(ride.last_updated_api)
            .bind(ride.computed_is_open)
            .bind(ride.park_appears_open)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            written += affected;
        }

        tx.commit().await?;

        let result = CycleWrite {
            rides_written: written,
            duplicates_rejected: rides.len() as u64 - written,
            park_written,
        };
        debug!(
            park_id = %park.park_id,
            rides_written = result.rides_written,
            duplicates = result.duplicates_rejected,
            "Cycle recorded"
        );
        Ok(result)
    }

    /// Ride snapshots for one ride in `[start, end)`, ordered by time.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn ride_snapshots_between(
        &self,
        ride_id: RideId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RideStatusSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, RideStatusSnapshot>(&format!(
            "SELECT {RIDE_SNAPSHOT_COLUMNS} FROM ride_status_snapshots \
             WHERE ride_id = $1 AND recorded_at >= $2 AND recorded_at < $3 \
             ORDER BY recorded_at"
        ))
        .bind(ride_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Ride snapshots for every active attraction of one park in
    /// `[start, end)`, ordered by ride then time.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn ride_snapshots_for_park(
        &self,
        park_id: ParkId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RideStatusSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, RideStatusSnapshot>(&format!(
            "SELECT rss.snapshot_id, rss.ride_id, rss.recorded_at, rss.is_open, rss.status, \
                    rss.wait_time, rss.last_updated_api, rss.computed_is_open, rss.park_appears_open \
             FROM ride_status_snapshots rss \
             JOIN rides r ON rss.ride_id = r.ride_id \
             WHERE r.park_id = $1 AND r.is_active = TRUE \
               AND rss.recorded_at >= $2 AND rss.recorded_at < $3 \
             ORDER BY rss.ride_id, rss.recorded_at"
        ))
        .bind(park_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Park snapshots for one park in `[start, end)`, ordered by time.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn park_snapshots_between(
        &self,
        park_id: ParkId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ParkActivitySnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, ParkActivitySnapshot>(&format!(
            "SELECT {PARK_SNAPSHOT_COLUMNS} FROM park_activity_snapshots \
             WHERE park_id = $1 AND recorded_at >= $2 AND recorded_at < $3 \
             ORDER BY recorded_at"
        ))
        .bind(park_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Latest park snapshot per active park since a floor timestamp, for the
    /// LIVE listing.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn latest_park_snapshots(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ParkActivitySnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, ParkActivitySnapshot>(&format!(
            "SELECT DISTINCT ON (pas.park_id) {columns} \
             FROM park_activity_snapshots pas \
             JOIN parks p ON pas.park_id = p.park_id \
             WHERE pas.recorded_at >= $1 AND p.is_active = TRUE \
             ORDER BY pas.park_id, pas.recorded_at DESC",
            columns = "pas.snapshot_id, pas.park_id, pas.recorded_at, pas.total_rides_tracked, \
                       pas.rides_open, pas.rides_closed, pas.avg_wait_time, pas.max_wait_time, \
                       pas.park_appears_open, pas.shame_score"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Distinct collection timestamps for one park in `[start, end)`, used by
    /// the interval-consistency audit.
    ///
    /// # Errors
    /// Returns error if the database query fails.
    pub async fn cycle_timestamps(
        &self,
        park_id: ParkId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT DISTINCT recorded_at FROM park_activity_snapshots \
             WHERE park_id = $1 AND recorded_at >= $2 AND recorded_at < $3 \
             ORDER BY recorded_at",
        )
        .bind(park_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(at,)| at).collect())
    }
}
