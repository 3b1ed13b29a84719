//! Snapshot retention.
//!
//! Raw snapshots are kept at full resolution for at least 24 hours and become
//! deletable only once every hourly aggregation window covering them has a
//! `success` log row. Gaps in the hourly log hold retention back rather than
//! risking data loss.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::aggregation_log::AggregationLogRepository;
use crate::error::StoreError;

/// Minimum full-resolution retention.
const MIN_RETENTION_HOURS: i64 = 24;

/// Deletes raw snapshots whose hours are fully aggregated.
pub struct RetentionPruner {
    pool: PgPool,
    log: AggregationLogRepository,
}

impl RetentionPruner {
    /// Create a new pruner.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let log = AggregationLogRepository::new(pool.clone());
        Self { pool, log }
    }

    /// The newest instant before which snapshots may be deleted, or `None`
    /// when nothing is deletable yet.
    ///
    /// # Errors
    /// Returns error if the log query fails.
    pub async fn cutoff(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, StoreError> {
        let age_floor = now - Duration::hours(MIN_RETENTION_HOURS);
        // Walk the hourly log forward from two days back; anything older than
        // that was either aggregated long ago or is unrecoverable anyway.
        let walk_start = now - Duration::hours(48);
        let covered = self.log.contiguous_hourly_success_until(walk_start).await?;

        Ok(covered.map(|covered_until| covered_until.min(age_floor)))
    }

    /// Delete snapshots older than the retention cutoff. Returns the number
    /// of ride and park rows removed.
    ///
    /// # Errors
    /// Returns error if a delete fails.
    pub async fn prune(&self, now: DateTime<Utc>) -> Result<(u64, u64), StoreError> {
        let Some(cutoff) = self.cutoff(now).await? else {
            info!("No completed hourly window eligible; skipping prune");
            return Ok((0, 0));
        };

        let ride_rows = sqlx::query("DELETE FROM ride_status_snapshots WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let park_rows = sqlx::query("DELETE FROM park_activity_snapshots WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(
            %cutoff,
            ride_rows,
            park_rows,
            "Pruned raw snapshots"
        );
        Ok((ride_rows, park_rows))
    }
}
