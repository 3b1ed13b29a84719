//! Repository for the aggregation job log.
//!
//! Each job run creates (or restarts) a row and transitions it
//! `running -> success | failed`. The latest contiguous run of successful
//! hourly windows gates snapshot retention.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};

use pdt_core::{AggregationLogEntry, AggregationStatus, AggregationType};
use pdt_time::hour_start;

use crate::error::StoreError;

/// Repository for `aggregation_log`.
pub struct AggregationLogRepository {
    pool: PgPool,
}

impl AggregationLogRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a fresh `running` entry. Hourly runs always get a new row so
    /// each hour's success or failure is individually visible.
    ///
    /// # Errors
    /// Returns error if the insert fails.
    pub async fn start(
        &self,
        aggregation_date: NaiveDate,
        aggregation_type: AggregationType,
        until_ts: Option<DateTime<Utc>>,
    ) -> Result<i64, StoreError> {
        let (log_id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO aggregation_log (
                aggregation_date, aggregation_type, aggregated_until_ts, started_at, status
            ) VALUES ($1, $2, $3, NOW(), 'running')
            RETURNING log_id
            ",
        )
        .bind(aggregation_date)
        .bind(aggregation_type.as_str())
        .bind(until_ts)
        .fetch_one(&self.pool)
        .await?;
        Ok(log_id)
    }

    /// Create or restart the single entry for a daily-style job. A rerun
    /// resets the existing row to `running` rather than adding a second one.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn start_or_restart(
        &self,
        aggregation_date: NaiveDate,
        aggregation_type: AggregationType,
    ) -> Result<i64, StoreError> {
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT log_id FROM aggregation_log \
             WHERE aggregation_date = $1 AND aggregation_type = $2 \
             ORDER BY log_id DESC LIMIT 1",
        )
        .bind(aggregation_date)
        .bind(aggregation_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some((log_id,)) = existing {
            sqlx::query(
                r"
                UPDATE aggregation_log
                SET status = 'running', started_at = NOW(), completed_at = NULL,
                    error_message = NULL, parks_processed = 0, rides_processed = 0
                WHERE log_id = $1
                ",
            )
            .bind(log_id)
            .execute(&self.pool)
            .await?;
            return Ok(log_id);
        }

        self.start(aggregation_date, aggregation_type, None).await
    }

    /// Mark a run successful.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub async fn complete(
        &self,
        log_id: i64,
        until_ts: Option<DateTime<Utc>>,
        parks_processed: i32,
        rides_processed: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE aggregation_log
            SET status = 'success', completed_at = NOW(),
                aggregated_until_ts = COALESCE($2, aggregated_until_ts),
                parks_processed = $3, rides_processed = $4
            WHERE log_id = $1
            ",
        )
        .bind(log_id)
        .bind(until_ts)
        .bind(parks_processed)
        .bind(rides_processed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark a run failed, preserving the counts so far.
    ///
    /// # Errors
    /// Returns error if the update fails.
    pub async fn fail(
        &self,
        log_id: i64,
        error_message: &str,
        parks_processed: i32,
        rides_processed: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE aggregation_log
            SET status = 'failed', completed_at = NOW(), error_message = $2,
                parks_processed = $3, rides_processed = $4
            WHERE log_id = $1
            ",
        )
        .bind(log_id)
        .bind(error_message)
        .bind(parks_processed)
        .bind(rides_processed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent successful run of a given type, for staleness reporting.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn last_successful(
        &self,
        aggregation_type: AggregationType,
    ) -> Result<Option<AggregationLogEntry>, StoreError> {
        let row: Option<LogRow> = sqlx::query_as(
            r"
            SELECT log_id, aggregation_date, aggregation_type, aggregated_until_ts,
                   started_at, completed_at, status, parks_processed, rides_processed,
                   error_message
            FROM aggregation_log
            WHERE aggregation_type = $1 AND status = 'success'
            ORDER BY aggregated_until_ts DESC NULLS LAST
            LIMIT 1
            ",
        )
        .bind(aggregation_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(try_from_log_row).transpose()
    }

    /// Whether any successful hourly run already covers `[hour, hour+1)`;
    /// used for the idempotent skip.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn hourly_already_succeeded(
        &self,
        hour_start_utc: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM aggregation_log \
             WHERE aggregation_type = 'hourly' AND status = 'success' \
               AND aggregated_until_ts = $1",
        )
        .bind(hour_start_utc + Duration::hours(1))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// End of the contiguous run of successful hourly windows starting at
    /// `floor`. A snapshot is only deletable when the hour containing it is
    /// inside this run.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn contiguous_hourly_success_until(
        &self,
        floor: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let rows: Vec<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            "SELECT aggregated_until_ts FROM aggregation_log \
             WHERE aggregation_type = 'hourly' AND status = 'success' \
               AND aggregated_until_ts > $1 \
             ORDER BY aggregated_until_ts",
        )
        .bind(floor)
        .fetch_all(&self.pool)
        .await?;

        let mut covered_until: Option<DateTime<Utc>> = None;
        let mut expected = hour_start(floor) + Duration::hours(1);
        for (until,) in rows.into_iter().flat_map(|(u,)| u.map(|u| (u,))) {
            if until == expected {
                covered_until = Some(until);
                expected = until + Duration::hours(1);
            } else if until > expected {
                // Gap: an hour in between never succeeded
                break;
            }
        }
        Ok(covered_until)
    }
}

#[derive(FromRow)]
struct LogRow {
    log_id: i64,
    aggregation_date: NaiveDate,
    aggregation_type: String,
    aggregated_until_ts: Option<DateTime<Utc>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    status: String,
    parks_processed: i32,
    rides_processed: i32,
    error_message: Option<String>,
}

fn try_from_log_row(row: LogRow) -> Result<AggregationLogEntry, StoreError> {
    Ok(AggregationLogEntry {
        log_id: row.log_id,
        aggregation_date: row.aggregation_date,
        aggregation_type: AggregationType::parse(&row.aggregation_type)?,
        aggregated_until_ts: row.aggregated_until_ts,
        started_at: row.started_at,
        completed_at: row.completed_at,
        status: AggregationStatus::parse(&row.status)?,
        parks_processed: row.parks_processed,
        rides_processed: row.rides_processed,
        error_message: row.error_message,
    })
}
