//! Upserts and supporting queries for the aggregate tables.
//!
//! Every write is an upsert on the table's natural key, so rerunning any job
//! for the same window converges to the same rows.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use pdt_core::{
    OperatingSession, ParkDailyStats, ParkHourlyStats, ParkId, RideDailyStats, RideHourlyStats,
    RideId,
};
use pdt_score::sql as score_sql;

use crate::error::AggregateError;

/// Repository over the aggregate tables.
pub struct StatsRepository {
    pool: PgPool,
}

/// Summed daily rows for one ride over a rollup window.
#[derive(Debug, Clone, FromRow)]
pub struct RideRollupSums {
    pub ride_id: RideId,
    pub uptime_minutes: i64,
    pub downtime_minutes: i64,
    pub operating_hours_minutes: i64,
    pub status_changes: i64,
    pub peak_wait_time: Option<i32>,
    /// SUM(avg_wait_time * operating_hours_minutes), for the weighted mean
    pub weighted_wait_sum: Option<Decimal>,
}

/// Summed ride-rollup rows for one park over a rollup window.
#[derive(Debug, Clone, FromRow)]
pub struct ParkRollupSums {
    pub park_id: ParkId,
    pub total_rides_tracked: i64,
    pub avg_uptime_percentage: Option<Decimal>,
    pub total_downtime_minutes: i64,
    pub rides_with_downtime: i64,
    pub peak_wait_time: Option<i32>,
    pub weighted_wait_sum: Option<Decimal>,
    pub total_operating_minutes: i64,
}

impl StatsRepository {
    /// Create a new repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Hourly
    // ------------------------------------------------------------------

    /// Upsert one ride-hour row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_ride_hourly(&self, row: &RideHourlyStats) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO ride_hourly_stats (
                ride_id, park_id, hour_start_utc, avg_wait_time_minutes,
                operating_snapshots, down_snapshots, downtime_hours,
                uptime_percentage, snapshot_count, ride_operated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (ride_id, hour_start_utc) DO UPDATE SET
                avg_wait_time_minutes = EXCLUDED.avg_wait_time_minutes,
                operating_snapshots = EXCLUDED.operating_snapshots,
                down_snapshots = EXCLUDED.down_snapshots,
                downtime_hours = EXCLUDED.downtime_hours,
                uptime_percentage = EXCLUDED.uptime_percentage,
                snapshot_count = EXCLUDED.snapshot_count,
                ride_operated = EXCLUDED.ride_operated,
                updated_at = NOW()
            ",
        )
        .bind(row.ride_id)
        .bind(row.park_id)
        .bind(row.hour_start_utc)
        .bind(row.avg_wait_time_minutes)
        .bind(row.operating_snapshots)
        .bind(row.down_snapshots)
        .bind(row.downtime_hours)
        .bind(row.uptime_percentage)
        .bind(row.snapshot_count)
        .bind(row.ride_operated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one park-hour row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_park_hourly(&self, row: &ParkHourlyStats) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO park_hourly_stats (
                park_id, hour_start_utc, shame_score, avg_wait_time_minutes,
                rides_operating, rides_down, total_downtime_hours,
                weighted_downtime_hours, effective_park_weight, snapshot_count,
                park_was_open
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (park_id, hour_start_utc) DO UPDATE SET
                shame_score = EXCLUDED.shame_score,
                avg_wait_time_minutes = EXCLUDED.avg_wait_time_minutes,
                rides_operating = EXCLUDED.rides_operating,
                rides_down = EXCLUDED.rides_down,
                total_downtime_hours = EXCLUDED.total_downtime_hours,
                weighted_downtime_hours = EXCLUDED.weighted_downtime_hours,
                effective_park_weight = EXCLUDED.effective_park_weight,
                snapshot_count = EXCLUDED.snapshot_count,
                park_was_open = EXCLUDED.park_was_open,
                updated_at = NOW()
            ",
        )
        .bind(row.park_id)
        .bind(row.hour_start_utc)
        .bind(row.shame_score)
        .bind(row.avg_wait_time_minutes)
        .bind(row.rides_operating)
        .bind(row.rides_down)
        .bind(row.total_downtime_hours)
        .bind(row.weighted_downtime_hours)
        .bind(row.effective_park_weight)
        .bind(row.snapshot_count)
        .bind(row.park_was_open)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Daily
    // ------------------------------------------------------------------

    /// Upsert one ride-day row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_ride_daily(&self, row: &RideDailyStats) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO ride_daily_stats (
                ride_id, stat_date, uptime_minutes, downtime_minutes,
                uptime_percentage, operating_hours_minutes, avg_wait_time,
                min_wait_time, max_wait_time, peak_wait_time, status_changes,
                longest_downtime_minutes, ride_operated, metrics_version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (ride_id, stat_date) DO UPDATE SET
                uptime_minutes = EXCLUDED.uptime_minutes,
                downtime_minutes = EXCLUDED.downtime_minutes,
                uptime_percentage = EXCLUDED.uptime_percentage,
                operating_hours_minutes = EXCLUDED.operating_hours_minutes,
                avg_wait_time = EXCLUDED.avg_wait_time,
                min_wait_time = EXCLUDED.min_wait_time,
                max_wait_time = EXCLUDED.max_wait_time,
                peak_wait_time = EXCLUDED.peak_wait_time,
                status_changes = EXCLUDED.status_changes,
                longest_downtime_minutes = EXCLUDED.longest_downtime_minutes,
                ride_operated = EXCLUDED.ride_operated,
                metrics_version = EXCLUDED.metrics_version,
                updated_at = NOW()
            ",
        )
        .bind(row.ride_id)
        .bind(row.stat_date)
        .bind(row.uptime_minutes)
        .bind(row.downtime_minutes)
        .bind(row.uptime_percentage)
        .bind(row.operating_hours_minutes)
        .bind(row.avg_wait_time)
        .bind(row.min_wait_time)
        .bind(row.max_wait_time)
        .bind(row.peak_wait_time)
        .bind(row.status_changes)
        .bind(row.longest_downtime_minutes)
        .bind(row.ride_operated)
        .bind(row.metrics_version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one park-day row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_park_daily(&self, row: &ParkDailyStats) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO park_daily_stats (
                park_id, stat_date, shame_score, total_downtime_hours,
                weighted_downtime_hours, avg_uptime_percentage,
                rides_with_downtime, total_rides_tracked,
                operating_hours_minutes, effective_park_weight, metrics_version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (park_id, stat_date) DO UPDATE SET
                shame_score = EXCLUDED.shame_score,
                total_downtime_hours = EXCLUDED.total_downtime_hours,
                weighted_downtime_hours = EXCLUDED.weighted_downtime_hours,
                avg_uptime_percentage = EXCLUDED.avg_uptime_percentage,
                rides_with_downtime = EXCLUDED.rides_with_downtime,
                total_rides_tracked = EXCLUDED.total_rides_tracked,
                operating_hours_minutes = EXCLUDED.operating_hours_minutes,
                effective_park_weight = EXCLUDED.effective_park_weight,
                metrics_version = EXCLUDED.metrics_version,
                updated_at = NOW()
            ",
        )
        .bind(row.park_id)
        .bind(row.stat_date)
        .bind(row.shame_score)
        .bind(row.total_downtime_hours)
        .bind(row.weighted_downtime_hours)
        .bind(row.avg_uptime_percentage)
        .bind(row.rides_with_downtime)
        .bind(row.total_rides_tracked)
        .bind(row.operating_hours_minutes)
        .bind(row.effective_park_weight)
        .bind(row.metrics_version)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one operating-session row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_operating_session(
        &self,
        session: &OperatingSession,
    ) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO operating_sessions (
                park_id, operating_date, first_open_utc, last_open_utc, operating_minutes
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (park_id, operating_date) DO UPDATE SET
                first_open_utc = EXCLUDED.first_open_utc,
                last_open_utc = EXCLUDED.last_open_utc,
                operating_minutes = EXCLUDED.operating_minutes,
                updated_at = NOW()
            ",
        )
        .bind(session.park_id)
        .bind(session.operating_date)
        .bind(session.first_open_utc)
        .bind(session.last_open_utc)
        .bind(session.operating_minutes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Supporting queries
    // ------------------------------------------------------------------

    /// Effective park weight as of a reference instant: tier-weight sum over
    /// active attractions inside the park-type-aware operated window.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn effective_park_weight(
        &self,
        park_id: ParkId,
        as_of: DateTime<Utc>,
    ) -> Result<f64, AggregateError> {
        let query = format!(
            "SELECT COALESCE(SUM({weight}), 0)::FLOAT8 \
             FROM rides r \
             LEFT JOIN ride_classifications rc ON r.ride_id = rc.ride_id \
             JOIN parks p ON r.park_id = p.park_id \
             WHERE r.park_id = $1 \
               AND r.is_active = TRUE \
               AND r.category = 'ATTRACTION' \
               AND {window}",
            weight = score_sql::tier_weight("rc"),
            window = score_sql::operated_window("r", "p", "$2"),
        );
        let (weight,): (f64,) = sqlx::query_as(&query)
            .bind(park_id)
            .bind(as_of)
            .fetch_one(&self.pool)
            .await?;
        Ok(weight)
    }

    /// Tier weights for one park's active attractions.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_weights(
        &self,
        park_id: ParkId,
    ) -> Result<HashMap<RideId, i32>, AggregateError> {
        let query = format!(
            "SELECT r.ride_id, {weight}::INT4 AS weight \
             FROM rides r \
             LEFT JOIN ride_classifications rc ON r.ride_id = rc.ride_id \
             WHERE r.park_id = $1 AND r.is_active = TRUE AND r.category = 'ATTRACTION'",
            weight = score_sql::tier_weight("rc"),
        );
        let rows: Vec<(RideId, i32)> = sqlx::query_as(&query)
            .bind(park_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// The set of rides that operated during `[start, end)` with their park
    /// open, computed once per run to avoid an N+1 pattern.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn rides_operated_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashSet<RideId>, AggregateError> {
        let query = format!(
            "WITH {cte} SELECT ride_id FROM rides_that_operated",
            cte = score_sql::rides_that_operated_cte("$1", "$2"),
        );
        let rows: Vec<(RideId,)> = sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // ------------------------------------------------------------------
    // Rollup reads and writes
    // ------------------------------------------------------------------

    /// Sum ride daily rows over `[start, end]` (inclusive dates), one row per
    /// ride that has data in the window.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_rollup_sums(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RideRollupSums>, AggregateError> {
        let rows = sqlx::query_as::<_, RideRollupSums>(
            r"
            SELECT
                ride_id,
                COALESCE(SUM(uptime_minutes), 0) AS uptime_minutes,
                COALESCE(SUM(downtime_minutes), 0) AS downtime_minutes,
                COALESCE(SUM(operating_hours_minutes), 0) AS operating_hours_minutes,
                COALESCE(SUM(status_changes), 0) AS status_changes,
                MAX(peak_wait_time) AS peak_wait_time,
                SUM(avg_wait_time * operating_hours_minutes) AS weighted_wait_sum
            FROM ride_daily_stats
            WHERE stat_date >= $1 AND stat_date <= $2
            GROUP BY ride_id
            ORDER BY ride_id
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Roll ride weekly rows up to parks for one ISO week.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_weekly_rollup_sums(
        &self,
        year: i32,
        week_number: i32,
    ) -> Result<Vec<ParkRollupSums>, AggregateError> {
        let rows = sqlx::query_as::<_, ParkRollupSums>(
            r"
            SELECT
                r.park_id,
                COUNT(DISTINCT rws.ride_id) AS total_rides_tracked,
                AVG(rws.uptime_percentage) AS avg_uptime_percentage,
                COALESCE(SUM(rws.downtime_minutes), 0) AS total_downtime_minutes,
                COALESCE(SUM(CASE WHEN rws.downtime_minutes > 0 THEN 1 ELSE 0 END), 0)
                    AS rides_with_downtime,
                MAX(rws.peak_wait_time) AS peak_wait_time,
                SUM(rws.avg_wait_time * rws.operating_hours_minutes) AS weighted_wait_sum,
                COALESCE(SUM(rws.operating_hours_minutes), 0) AS total_operating_minutes
            FROM ride_weekly_stats rws
            JOIN rides r ON rws.ride_id = r.ride_id
            WHERE rws.year = $1 AND rws.week_number = $2 AND r.is_active = TRUE
            GROUP BY r.park_id
            ORDER BY r.park_id
            ",
        )
        .bind(year)
        .bind(week_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Roll ride monthly rows up to parks for one calendar month.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_monthly_rollup_sums(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<ParkRollupSums>, AggregateError> {
        let rows = sqlx::query_as::<_, ParkRollupSums>(
            r"
            SELECT
                r.park_id,
                COUNT(DISTINCT rms.ride_id) AS total_rides_tracked,
                AVG(rms.uptime_percentage) AS avg_uptime_percentage,
                COALESCE(SUM(rms.downtime_minutes), 0) AS total_downtime_minutes,
                COALESCE(SUM(CASE WHEN rms.downtime_minutes > 0 THEN 1 ELSE 0 END), 0)
                    AS rides_with_downtime,
                MAX(rms.peak_wait_time) AS peak_wait_time,
                SUM(rms.avg_wait_time * rms.operating_hours_minutes) AS weighted_wait_sum,
                COALESCE(SUM(rms.operating_hours_minutes), 0) AS total_operating_minutes
            FROM ride_monthly_stats rms
            JOIN rides r ON rms.ride_id = r.ride_id
            WHERE rms.year = $1 AND rms.month = $2 AND r.is_active = TRUE
            GROUP BY r.park_id
            ORDER BY r.park_id
            ",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Previous-period downtime per ride for the weekly trend.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_weekly_downtime(
        &self,
        year: i32,
        week_number: i32,
    ) -> Result<HashMap<RideId, i32>, AggregateError> {
        let rows: Vec<(RideId, i32)> = sqlx::query_as(
            "SELECT ride_id, downtime_minutes FROM ride_weekly_stats \
             WHERE year = $1 AND week_number = $2",
        )
        .bind(year)
        .bind(week_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Previous-period downtime hours per park for the weekly trend.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_weekly_downtime(
        &self,
        year: i32,
        week_number: i32,
    ) -> Result<HashMap<ParkId, f64>, AggregateError> {
        let rows: Vec<(ParkId, f64)> = sqlx::query_as(
            "SELECT park_id, total_downtime_hours::FLOAT8 FROM park_weekly_stats \
             WHERE year = $1 AND week_number = $2",
        )
        .bind(year)
        .bind(week_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Previous-period downtime per ride for the monthly trend.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_monthly_downtime(
        &self,
        year: i32,
        month: i32,
    ) -> Result<HashMap<RideId, i32>, AggregateError> {
        let rows: Vec<(RideId, i32)> = sqlx::query_as(
            "SELECT ride_id, downtime_minutes FROM ride_monthly_stats \
             WHERE year = $1 AND month = $2",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Previous-period downtime hours per park for the monthly trend.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_monthly_downtime(
        &self,
        year: i32,
        month: i32,
    ) -> Result<HashMap<ParkId, f64>, AggregateError> {
        let rows: Vec<(ParkId, f64)> = sqlx::query_as(
            "SELECT park_id, total_downtime_hours::FLOAT8 FROM park_monthly_stats \
             WHERE year = $1 AND month = $2",
        )
        .bind(year)
        .bind(month)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Upsert one ride weekly row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_ride_weekly(
        &self,
        row: &pdt_core::RideWeeklyStats,
    ) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO ride_weekly_stats (
                ride_id, year, week_number, week_start_date, uptime_minutes,
                downtime_minutes, uptime_percentage, operating_hours_minutes,
                avg_wait_time, peak_wait_time, status_changes, trend_vs_previous
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (ride_id, year, week_number) DO UPDATE SET
                week_start_date = EXCLUDED.week_start_date,
                uptime_minutes = EXCLUDED.uptime_minutes,
                downtime_minutes = EXCLUDED.downtime_minutes,
                uptime_percentage = EXCLUDED.uptime_percentage,
                operating_hours_minutes = EXCLUDED.operating_hours_minutes,
                avg_wait_time = EXCLUDED.avg_wait_time,
                peak_wait_time = EXCLUDED.peak_wait_time,
                status_changes = EXCLUDED.status_changes,
                trend_vs_previous = EXCLUDED.trend_vs_previous,
                updated_at = NOW()
            ",
        )
        .bind(row.ride_id)
        .bind(row.year)
        .bind(row.week_number)
        .bind(row.week_start_date)
        .bind(row.uptime_minutes)
        .bind(row.downtime_minutes)
        .bind(row.uptime_percentage)
        .bind(row.operating_hours_minutes)
        .bind(row.avg_wait_time)
        .bind(row.peak_wait_time)
        .bind(row.status_changes)
        .bind(row.trend_vs_previous)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one park weekly row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    pub async fn upsert_park_weekly(
        &self,
        row: &pdt_core::ParkWeeklyStats,
    ) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO park_weekly_stats (
                park_id, year, week_number, week_start_date, total_rides_tracked,
                avg_uptime_percentage, total_downtime_hours, rides_with_downtime,
                avg_wait_time, peak_wait_time, trend_vs_previous
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (park_id, year, week_number) DO UPDATE SET
                week_start_date = EXCLUDED.week_start_date,
                total_rides_tracked = EXCLUDED.total_rides_tracked,
                avg_uptime_percentage = EXCLUDED.avg_uptime_percentage,
                total_downtime_hours = EXCLUDED.total_downtime_hours,
                rides_with_downtime = EXCLUDED.rides_with_downtime,
                avg_wait_time = EXCLUDED.avg_wait_time,
                peak_wait_time = EXCLUDED.peak_wait_time,
                trend_vs_previous = EXCLUDED.trend_vs_previous,
                updated_at = NOW()
            ",
        )
        .bind(row.park_id)
        .bind(row.year)
        .bind(row.week_number)
        .bind(row.week_start_date)
        .bind(row.total_rides_tracked)
        .bind(row.avg_uptime_percentage)
        .bind(row.total_downtime_hours)
        .bind(row.rides_with_downtime)
        .bind(row.avg_wait_time)
        .bind(row.peak_wait_time)
        .bind(row.trend_vs_previous)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one ride monthly row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_ride_monthly(
        &self,
        ride_id: RideId,
        year: i32,
        month: i32,
        sums: &RideRollupSums,
        uptime_percentage: Decimal,
        avg_wait_time: Option<Decimal>,
        trend_vs_previous: Option<Decimal>,
    ) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO ride_monthly_stats (
                ride_id, year, month, uptime_minutes, downtime_minutes,
                uptime_percentage, operating_hours_minutes, avg_wait_time,
                peak_wait_time, status_changes, trend_vs_previous
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (ride_id, year, month) DO UPDATE SET
                uptime_minutes = EXCLUDED.uptime_minutes,
                downtime_minutes = EXCLUDED.downtime_minutes,
                uptime_percentage = EXCLUDED.uptime_percentage,
                operating_hours_minutes = EXCLUDED.operating_hours_minutes,
                avg_wait_time = EXCLUDED.avg_wait_time,
                peak_wait_time = EXCLUDED.peak_wait_time,
                status_changes = EXCLUDED.status_changes,
                trend_vs_previous = EXCLUDED.trend_vs_previous,
                updated_at = NOW()
            ",
        )
        .bind(ride_id)
        .bind(year)
        .bind(month)
        .bind(sums.uptime_minutes as i32)
        .bind(sums.downtime_minutes as i32)
        .bind(uptime_percentage)
        .bind(sums.operating_hours_minutes as i32)
        .bind(avg_wait_time)
        .bind(sums.peak_wait_time)
        .bind(sums.status_changes as i32)
        .bind(trend_vs_previous)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert one park monthly row.
    ///
    /// # Errors
    /// Returns error if the upsert fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_park_monthly(
        &self,
        park_id: ParkId,
        year: i32,
        month: i32,
        sums: &ParkRollupSums,
        total_downtime_hours: Decimal,
        avg_wait_time: Option<Decimal>,
        trend_vs_previous: Option<Decimal>,
    ) -> Result<(), AggregateError> {
        sqlx::query(
            r"
            INSERT INTO park_monthly_stats (
                park_id, year, month, total_rides_tracked, avg_uptime_percentage,
                total_downtime_hours, rides_with_downtime, avg_wait_time,
                peak_wait_time, trend_vs_previous
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (park_id, year, month) DO UPDATE SET
                total_rides_tracked = EXCLUDED.total_rides_tracked,
                avg_uptime_percentage = EXCLUDED.avg_uptime_percentage,
                total_downtime_hours = EXCLUDED.total_downtime_hours,
                rides_with_downtime = EXCLUDED.rides_with_downtime,
                avg_wait_time = EXCLUDED.avg_wait_time,
                peak_wait_time = EXCLUDED.peak_wait_time,
                trend_vs_previous = EXCLUDED.trend_vs_previous,
                updated_at = NOW()
            ",
        )
        .bind(park_id)
        .bind(year)
        .bind(month)
        .bind(sums.total_rides_tracked as i32)
        .bind(sums.avg_uptime_percentage.map(|d| d.round_dp(2)))
        .bind(total_downtime_hours)
        .bind(sums.rides_with_downtime as i32)
        .bind(avg_wait_time)
        .bind(sums.peak_wait_time)
        .bind(trend_vs_previous)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads for the audit crate
    // ------------------------------------------------------------------

    /// Stored ride daily rows for one date.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_daily_for_date(
        &self,
        stat_date: NaiveDate,
    ) -> Result<Vec<RideDailyStats>, AggregateError> {
        let rows = sqlx::query_as::<_, RideDailyStats>(
            "SELECT ride_id, stat_date, uptime_minutes, downtime_minutes, uptime_percentage, \
                    operating_hours_minutes, avg_wait_time, min_wait_time, max_wait_time, \
                    peak_wait_time, status_changes, longest_downtime_minutes, ride_operated, \
                    metrics_version \
             FROM ride_daily_stats WHERE stat_date = $1 ORDER BY ride_id",
        )
        .bind(stat_date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stored park daily rows for one date.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_daily_for_date(
        &self,
        stat_date: NaiveDate,
    ) -> Result<Vec<ParkDailyStats>, AggregateError> {
        let rows = sqlx::query_as::<_, ParkDailyStats>(
            "SELECT park_id, stat_date, shame_score, total_downtime_hours, \
                    weighted_downtime_hours, avg_uptime_percentage, rides_with_downtime, \
                    total_rides_tracked, operating_hours_minutes, effective_park_weight, \
                    metrics_version \
             FROM park_daily_stats WHERE stat_date = $1 ORDER BY park_id",
        )
        .bind(stat_date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stored ride hourly rows for one hour.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_hourly_for_hour(
        &self,
        hour_start_utc: DateTime<Utc>,
    ) -> Result<Vec<RideHourlyStats>, AggregateError> {
        let rows = sqlx::query_as::<_, RideHourlyStats>(
            "SELECT ride_id, park_id, hour_start_utc, avg_wait_time_minutes, \
                    operating_snapshots, down_snapshots, downtime_hours, uptime_percentage, \
                    snapshot_count, ride_operated \
             FROM ride_hourly_stats WHERE hour_start_utc = $1 ORDER BY ride_id",
        )
        .bind(hour_start_utc)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stored park hourly rows for one hour.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_hourly_for_hour(
        &self,
        hour_start_utc: DateTime<Utc>,
    ) -> Result<Vec<ParkHourlyStats>, AggregateError> {
        let rows = sqlx::query_as::<_, ParkHourlyStats>(
            "SELECT park_id, hour_start_utc, shame_score, avg_wait_time_minutes, \
                    rides_operating, rides_down, total_downtime_hours, weighted_downtime_hours, \
                    effective_park_weight, snapshot_count, park_was_open \
             FROM park_hourly_stats WHERE hour_start_utc = $1 ORDER BY park_id",
        )
        .bind(hour_start_utc)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
