//! Ride ranking queries: the least-reliable-ride listings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use pdt_score::sql as score_sql;

use crate::error::QueryError;
use crate::types::{RankingFilter, RideRankingEntry};

#[derive(FromRow)]
struct RideRankingRow {
    ride_id: i64,
    ride_name: String,
    park_name: String,
    city: String,
    state_province: String,
    tier: Option<i16>,
    downtime_hours: Option<Decimal>,
    weighted_downtime_hours: Option<Decimal>,
    uptime_percentage: Option<Decimal>,
}

fn into_entries(rows: Vec<RideRankingRow>) -> Vec<RideRankingEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| RideRankingEntry {
            rank: i as u32 + 1,
            ride_id: row.ride_id,
            ride_name: row.ride_name,
            park_name: row.park_name,
            location: format!("{}, {}", row.city, row.state_province),
            tier: row.tier,
            downtime_hours: row.downtime_hours.and_then(|d| d.to_f64()).unwrap_or(0.0),
            weighted_downtime_hours: row
                .weighted_downtime_hours
                .and_then(|d| d.to_f64())
                .unwrap_or(0.0),
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

/// Deterministic ordering for ride listings: worst downtime first.
const RIDE_ORDER: &str =
    "downtime_hours DESC NULLS LAST, weighted_downtime_hours DESC NULLS LAST, ride_id ASC";

/// Ride ranking query handlers.
pub struct RideRankings {
    pool: PgPool,
    interval_minutes: u32,
}

impl RideRankings {
    /// Create the handler set.
    #[must_use]
    pub const fn new(pool: PgPool, interval_minutes: u32) -> Self {
        Self {
            pool,
            interval_minutes,
        }
    }

    /// Raw-snapshot path over an arbitrary window (LIVE and TODAY).
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn raw_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: RankingFilter,
        limit: i64,
    ) -> Result<Vec<RideRankingEntry>, QueryError> {
        let operated = score_sql::rides_that_operated_cte("$1", "$2");
        let park_open = score_sql::park_open("pas");
        let is_down = score_sql::is_down("rss", "p");
        let weight = score_sql::tier_weight("rc");
        let minute_join = score_sql::minute_join("pas", "rss");
        let hours = format!("{} / 60.0", self.interval_minutes);

        let query = format!(
            "WITH {operated} \
             SELECT r.ride_id, r.name AS ride_name, p.name AS park_name, \
                    p.city, p.state_province, \
                    COALESCE(rc.tier, r.tier) AS tier, \
                    ROUND(CAST(SUM(CASE WHEN {park_open} AND ({is_down}) \
                        THEN {hours} ELSE 0 END) AS numeric), 2) AS downtime_hours, \
                    ROUND(CAST(SUM(CASE WHEN {park_open} AND ({is_down}) \
                        THEN ({hours}) * {weight} ELSE 0 END) AS numeric), 2) \
                        AS weighted_downtime_hours, \
                    ROUND(CAST(100.0 * SUM(CASE WHEN {park_open} AND rss.computed_is_open \
                            THEN 1 ELSE 0 END) AS numeric) \
                        / NULLIF(SUM(CASE WHEN {park_open} THEN 1 ELSE 0 END), 0), 1) \
                        AS uptime_percentage \
             FROM rides r \
             JOIN parks p ON r.park_id = p.park_id \
             LEFT JOIN ride_classifications rc ON r.ride_id = rc.ride_id \
             JOIN ride_status_snapshots rss ON r.ride_id = rss.ride_id \
             JOIN park_activity_snapshots pas ON pas.park_id = p.park_id AND {minute_join} \
             WHERE rss.recorded_at >= $1 AND rss.recorded_at < $2 \
               AND r.is_active = TRUE AND r.category = 'ATTRACTION' \
               AND p.is_active = TRUE {filter} \
               AND r.ride_id IN (SELECT ride_id FROM rides_that_operated) \
             GROUP BY r.ride_id, r.name, p.name, p.city, p.state_province, rc.tier, r.tier \
             HAVING SUM(CASE WHEN {park_open} AND ({is_down}) THEN 1 ELSE 0 END) > 0 \
             ORDER BY {RIDE_ORDER} \
             LIMIT $3",
            filter = filter_clause(filter),
        );
        let rows = sqlx::query_as::<_, RideRankingRow>(&query)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }

    /// Aggregate path over an inclusive date range (YESTERDAY and trailing
    /// windows). Rides with zero downtime in the window are excluded.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn daily_range(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        filter: RankingFilter,
        limit: i64,
    ) -> Result<Vec<RideRankingEntry>, QueryError> {
        let weight = score_sql::tier_weight("rc");
        let query = format!(
            "SELECT r.ride_id, r.name AS ride_name, p.name AS park_name, \
                    p.city, p.state_province, \
                    COALESCE(rc.tier, r.tier) AS tier, \
                    ROUND(CAST(SUM(rds.downtime_minutes) / 60.0 AS numeric), 2) \
                        AS downtime_hours, \
                    ROUND(CAST(SUM(rds.downtime_minutes * {weight}) / 60.0 AS numeric), 2) \
                        AS weighted_downtime_hours, \
                    ROUND(AVG(rds.uptime_percentage), 1) AS uptime_percentage \
             FROM ride_daily_stats rds \
             JOIN rides r ON rds.ride_id = r.ride_id \
             JOIN parks p ON r.park_id = p.park_id \
             LEFT JOIN ride_classifications rc ON r.ride_id = rc.ride_id \
             WHERE rds.stat_date >= $1 AND rds.stat_date <= $2 \
               AND r.is_active = TRUE AND r.category = 'ATTRACTION' \
               AND p.is_active = TRUE {filter} \
             GROUP BY r.ride_id, r.name, p.name, p.city, p.state_province, rc.tier, r.tier \
             HAVING SUM(rds.downtime_minutes) > 0 \
             ORDER BY {RIDE_ORDER} \
             LIMIT $3",
            filter = filter_clause(filter),
        );
        let rows = sqlx::query_as::<_, RideRankingRow>(&query)
            .bind(start_date)
            .bind(end_date)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_entries(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_and_conversion() {
        let rows = vec![RideRankingRow {
            ride_id: 9,
            ride_name: "Space Mountain".to_string(),
            park_name: "Magic Kingdom".to_string(),
            city: "Orlando".to_string(),
            state_province: "Florida".to_string(),
            tier: Some(1),
            downtime_hours: Some(Decimal::new(45, 1)),
            weighted_downtime_hours: Some(Decimal::new(135, 1)),
            uptime_percentage: Some(Decimal::new(812, 1)),
        }];
        let entries = into_entries(rows);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].downtime_hours, 4.5);
        assert_eq!(entries[0].weighted_downtime_hours, 13.5);
        assert_eq!(entries[0].uptime_percentage, Some(81.2));
    }

    #[test]
    fn test_ride_order_is_deterministic() {
        assert!(RIDE_ORDER.ends_with("ride_id ASC"));
    }
}
