//! Park ranking queries, one per period/source combination.
//!
//! Raw-path predicates come from the `pdt-score` SQL fragments. Ordering is
//! always deterministic: the requested sort key, then downtime, then id.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use pdt_score::sql as score_sql;

use crate::error::QueryError;
use crate::types::{ParkRankingEntry, RankingFilter, SortBy};

#[derive(FromRow)]
struct ParkRankingRow {
    park_id: i64,
    park_name: String,
    city: String,
    state_province: String,
    shame_score: Option<Decimal>,
    total_downtime_hours: Option<Decimal>,
    weighted_downtime_hours: Option<Decimal>,
    rides_down: Option<i32>,
    rides_operating: Option<i32>,
    uptime_percentage: Option<Decimal>,
}

fn into_entries(rows: Vec<ParkRankingRow>) -> Vec<ParkRankingEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| ParkRankingEntry {
            rank: i as u32 + 1,
            park_id: row.park_id,
            park_name: row.park_name,
            location: format!("{}, {}", row.city, row.state_province),
            shame_score: row.shame_score.and_then(|d| d.to_f64()).unwrap_or(0.0),
            total_downtime_hours: row
                .total_downtime_hours
                .and_then(|d| d.to_f64())
                .unwrap_or(0.0),
            weighted_downtime_hours: row
                .weighted_downtime_hours
                .and_then(|d| d.to_f64())
                .unwrap_or(0.0),
            rides_down: row.rides_down.unwrap_or(0),
            rides_operating: row.rides_operating.unwrap_or(0),
            uptime_percentage: row.uptime_percentage.and_then(|d| d.to_f64()),
        })
        .collect()
}

fn filter_clause(filter: RankingFilter) -> String {
    match filter {
        RankingFilter::AllParks => String::new(),
        RankingFilter::DisneyUniversal => {
            format!("AND {}", score_sql::disney_universal("p"))
        }
    }
}

const fn order_clause(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::ShameScore => {
            "shame_score DESC NULLS LAST, total_downtime_hours DESC NULLS LAST, park_id ASC"
        }
        SortBy::DowntimeHours => {
            "total_downtime_hours DESC NULLS LAST, shame_score DESC NULLS LAST, park_id ASC"
        }
    }
}

/// The raw-snapshot downtime CTEs over `[$1, $2)`, shared by every raw-path
/// ranking. Parameters: `$1` window start, `$2` window end.
fn raw_window_ctes(interval_minutes: u32) -> String {
    let operated = score_sql::rides_that_operated_cte("$1", "$2");
    let park_open = score_sql::park_open("pas");
    let is_down = score_sql::is_down("rss", "p");
    let weight = score_sql::tier_weight("rc");
    let minute_join = score_sql::minute_join("pas", "rss");
    let hours = format!("{interval_minutes} / 60.0");

    format!(
        "{operated}, \
         shame AS ( \
             SELECT pas.park_id, \
                    ROUND(AVG(CASE WHEN {park_open} THEN pas.shame_score END), 1) AS shame_score \
             FROM park_activity_snapshots pas \
             WHERE pas.recorded_at >= $1 AND pas.recorded_at < $2 \
             GROUP BY pas.park_id \
         ), \
         downtime AS ( \
             SELECT p.park_id, \
                    ROUND(CAST(SUM(CASE WHEN {park_open} AND ({is_down}) AND rto.ride_id IS NOT NULL \
                        THEN {hours} ELSE 0 END) AS numeric), 2) AS total_downtime_hours, \
                    ROUND(CAST(SUM(CASE WHEN {park_open} AND ({is_down}) AND rto.ride_id IS NOT NULL \
                        THEN ({hours}) * {weight} ELSE 0 END) AS numeric), 2) AS weighted_downtime_hours, \
                    CAST(COUNT(DISTINCT CASE WHEN {park_open} AND ({is_down}) AND rto.ride_id IS NOT NULL \
                        THEN r.ride_id END) AS INT4) AS rides_down, \
                    CAST(COUNT(DISTINCT CASE WHEN rss.computed_is_open THEN r.ride_id END) AS INT4) \
                        AS rides_operating, \
                    ROUND(CAST(100.0 * SUM(CASE WHEN {park_open} AND rto.ride_id IS NOT NULL \
                            AND NOT ({is_down}) THEN 1 ELSE 0 END) AS numeric) \
                        / NULLIF(SUM(CASE WHEN {park_open} AND rto.ride_id IS NOT NULL \
                            THEN 1 ELSE 0 END), 0), 1) AS uptime_percentage \
             FROM parks p \
             JOIN rides r ON p.park_id = r.park_id \
                 AND r.is_active = TRUE AND r.category = 'ATTRACTION' \
             LEFT JOIN ride_classifications rc ON r.ride_id = rc.ride_id \
             JOIN ride_status_snapshots rss ON r.ride_id = rss.ride_id \
             JOIN park_activity_snapshots pas ON pas.park_id = p.park_id AND {minute_join} \
             LEFT JOIN rides_that_operated rto ON rto.ride_id = r.ride_id \
             WHERE rss.recorded_at >= $1 AND rss.recorded_at < $2 AND p.is_active = TRUE \
             GROUP BY p.park_id \
         )"
    )
}

/// Park ranking query handlers.
pub struct ParkRankings {
    pool: PgPool,
    interval_minutes: u32,
}

impl ParkRankings {
    /// Create the handler set.
    #[must_use]
    pub const fn new(pool: PgPool, interval_minutes: u32) -> Self {
        Self {
            pool,
            interval_minutes,
        }
    }

    /// LIVE: the latest stamped score per park, downtime over the trailing
    /// window. Parks with nothing to show are excluded.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn live(
        &self,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
        filter: RankingFilter,
        limit: i64,
    ) -> Result<Vec<ParkRankingEntry>, QueryError> {
        let query = format!(
            "WITH {ctes}, \
             latest AS ( \
                 SELECT DISTINCT ON (park_id) park_id, rides_open, rides_closed, shame_score \
                 FROM park_activity_snapshots \
                 WHERE recorded_at >= $1 \
                 ORDER BY park_id, recorded_at DESC \
             ) \
             SELECT p.park_id, p.name AS park_name, p.city, p.state_province, \
                    l.shame_score, \
                    d.total_downtime_hours, d.weighted_downtime_hours, \
                    COALESCE(d.rides_down, l.rides_closed) AS rides_down, \
                    COALESCE(d.rides_operating, l.rides_open) AS rides_operating, \
                    d.uptime_percentage \
             FROM parks p \
             JOIN latest l ON p.park_id = l.park_id \
             LEFT JOIN downtime d ON p.park_id = d.park_id \
             WHERE p.is_active = TRUE {filter} \
               AND (COALESCE(l.shame_score, 0) > 0 OR COALESCE(d.total_downtime_hours, 0) > 0) \
             ORDER BY {order} \
             LIMIT $3",
            ctes = raw_window_ctes(self.interval_minutes),
            filter = filter_clause(filter),
            order = order_clause(SortBy::ShameScore),
        );
        let rows = sqlx::query_as::<_, ParkRankingRow>(&query)
            .bind(window_start)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }

    /// TODAY fast path: complete hours from the hourly aggregates unioned
    /// with the current partial hour from raw snapshots. The score is the
    /// simple mean of per-hour means. Zero-score parks did not earn a rank.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn today_fast(
        &self,
        day_start: DateTime<Utc>,
        current_hour: DateTime<Utc>,
        now: DateTime<Utc>,
        filter: RankingFilter,
        sort_by: SortBy,
        limit: i64,
    ) -> Result<Vec<ParkRankingEntry>, QueryError> {
        let park_open = score_sql::park_open("pas");
        let query = format!(
            "WITH hourly AS ( \
                 SELECT park_id, shame_score, total_downtime_hours, weighted_downtime_hours \
                 FROM park_hourly_stats \
                 WHERE hour_start_utc >= $1 AND hour_start_utc < $2 \
             ), \
             partial AS ( \
                 SELECT pas.park_id, \
                        ROUND(AVG(CASE WHEN {park_open} THEN pas.shame_score END), 1) AS shame_score \
                 FROM park_activity_snapshots pas \
                 WHERE pas.recorded_at >= $2 AND pas.recorded_at < $3 \
                 GROUP BY pas.park_id \
             ), \
             combined AS ( \
                 SELECT park_id, shame_score FROM hourly WHERE shame_score IS NOT NULL \
                 UNION ALL \
                 SELECT park_id, shame_score FROM partial WHERE shame_score IS NOT NULL \
             ), \
             shame AS ( \
                 SELECT park_id, ROUND(AVG(shame_score), 1) AS shame_score \
                 FROM combined GROUP BY park_id \
             ), \
             downtime AS ( \
                 SELECT park_id, \
                        ROUND(CAST(SUM(total_downtime_hours) AS numeric), 2) AS total_downtime_hours, \
                        ROUND(CAST(SUM(weighted_downtime_hours) AS numeric), 2) AS weighted_downtime_hours \
                 FROM hourly GROUP BY park_id \
             ), \
             uptime AS ( \
                 SELECT park_id, ROUND(AVG(uptime_percentage), 1) AS uptime_percentage \
                 FROM ride_hourly_stats \
                 WHERE hour_start_utc >= $1 AND hour_start_utc < $2 AND ride_operated \
                 GROUP BY park_id \
             ), \
             latest AS ( \
                 SELECT DISTINCT ON (park_id) park_id, rides_open, rides_closed \
                 FROM park_activity_snapshots \
                 WHERE recorded_at >= $1 \
                 ORDER BY park_id, recorded_at DESC \
             ) \
             SELECT p.park_id, p.name AS park_name, p.city, p.state_province, \
                    s.shame_score, \
                    d.total_downtime_hours, d.weighted_downtime_hours, \
                    l.rides_closed AS rides_down, l.rides_open AS rides_operating, \
                    u.uptime_percentage \
             FROM parks p \
             JOIN shame s ON p.park_id = s.park_id \
             LEFT JOIN downtime d ON p.park_id = d.park_id \
             LEFT JOIN uptime u ON p.park_id = u.park_id \
             LEFT JOIN latest l ON p.park_id = l.park_id \
             WHERE p.is_active = TRUE {filter} \
               AND COALESCE(s.shame_score, 0) > 0 \
             ORDER BY {order} \
             LIMIT $4",
            filter = filter_clause(filter),
            order = order_clause(sort_by),
        );
        let rows = sqlx::query_as::<_, ParkRankingRow>(&query)
            .bind(day_start)
            .bind(current_hour)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }

    /// Raw-snapshot path over an arbitrary window: TODAY slow path and the
    /// YESTERDAY fallback. `include_zero` keeps zero-score parks in the
    /// listing (YESTERDAY semantics).
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn raw_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: RankingFilter,
        sort_by: SortBy,
        limit: i64,
        include_zero: bool,
    ) -> Result<Vec<ParkRankingEntry>, QueryError> {
        let zero_clause = if include_zero {
            ""
        } else {
            "AND COALESCE(s.shame_score, 0) > 0"
        };
        let query = format!(
            "WITH {ctes} \
             SELECT p.park_id, p.name AS park_name, p.city, p.state_province, \
                    s.shame_score, \
                    d.total_downtime_hours, d.weighted_downtime_hours, \
                    d.rides_down, d.rides_operating, d.uptime_percentage \
             FROM parks p \
             JOIN shame s ON p.park_id = s.park_id \
             LEFT JOIN downtime d ON p.park_id = d.park_id \
             WHERE p.is_active = TRUE {filter} {zero_clause} \
             ORDER BY {order} \
             LIMIT $3",
            ctes = raw_window_ctes(self.interval_minutes),
            filter = filter_clause(filter),
            order = order_clause(sort_by),
        );
        let rows = sqlx::query_as::<_, ParkRankingRow>(&query)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }

    /// YESTERDAY primary path: one immutable daily row per park. Zero-score
    /// parks are included; the downtime tie-break orders them.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn daily(
        &self,
        stat_date: NaiveDate,
        filter: RankingFilter,
        sort_by: SortBy,
        limit: i64,
    ) -> Result<Vec<ParkRankingEntry>, QueryError> {
        let query = format!(
            "SELECT p.park_id, p.name AS park_name, p.city, p.state_province, \
                    pds.shame_score, \
                    pds.total_downtime_hours, pds.weighted_downtime_hours, \
                    pds.rides_with_downtime AS rides_down, \
                    CAST(pds.total_rides_tracked - pds.rides_with_downtime AS INT4) \
                        AS rides_operating, \
                    pds.avg_uptime_percentage AS uptime_percentage \
             FROM park_daily_stats pds \
             JOIN parks p ON pds.park_id = p.park_id \
             WHERE pds.stat_date = $1 AND p.is_active = TRUE {filter} \
             ORDER BY {order} \
             LIMIT $2",
            filter = filter_clause(filter),
            order = order_clause(sort_by),
        );
        let rows = sqlx::query_as::<_, ParkRankingRow>(&query)
            .bind(stat_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }

    /// Trailing-N-days path: averages and sums over daily rows.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn trailing_daily(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        filter: RankingFilter,
        sort_by: SortBy,
        limit: i64,
    ) -> Result<Vec<ParkRankingEntry>, QueryError> {
        let query = format!(
            "SELECT p.park_id, p.name AS park_name, p.city, p.state_province, \
                    ROUND(AVG(pds.shame_score), 1) AS shame_score, \
                    ROUND(CAST(SUM(pds.total_downtime_hours) AS numeric), 2) \
                        AS total_downtime_hours, \
                    ROUND(CAST(SUM(pds.weighted_downtime_hours) AS numeric), 2) \
                        AS weighted_downtime_hours, \
                    CAST(ROUND(AVG(pds.rides_with_downtime)) AS INT4) AS rides_down, \
                    CAST(ROUND(AVG(pds.total_rides_tracked - pds.rides_with_downtime)) AS INT4) \
                        AS rides_operating, \
                    ROUND(AVG(pds.avg_uptime_percentage), 1) AS uptime_percentage \
             FROM park_daily_stats pds \
             JOIN parks p ON pds.park_id = p.park_id \
             WHERE pds.stat_date >= $1 AND pds.stat_date <= $2 \
               AND p.is_active = TRUE {filter} \
             GROUP BY p.park_id, p.name, p.city, p.state_province \
             ORDER BY {order} \
             LIMIT $3",
            filter = filter_clause(filter),
            order = order_clause(sort_by),
        );
        let rows = sqlx::query_as::<_, ParkRankingRow>(&query)
            .bind(start_date)
            .bind(end_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }
}
