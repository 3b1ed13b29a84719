//! Time-series chart queries for parks and rides.
//!
//! All labels are rendered in park-local time but computed from UTC. Hourly
//! charts cover 06:00-23:00 local by convention.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use pdt_score::sql as score_sql;
use pdt_time::{local_hour_of, local_label_hm};

use crate::error::QueryError;
use crate::types::{Granularity, TimeSeriesResponse};

/// Hourly charts cover this local-hour range.
const CHART_FIRST_HOUR: u32 = 6;
const CHART_LAST_HOUR: u32 = 23;

#[derive(FromRow)]
struct SnapshotPointRow {
    recorded_at: DateTime<Utc>,
    shame_score: Option<Decimal>,
    rides_closed: i32,
    avg_wait_time: Option<Decimal>,
}

#[derive(FromRow)]
struct HourlyPointRow {
    hour_start_utc: DateTime<Utc>,
    value: Option<Decimal>,
    rides_down: Option<i32>,
    avg_wait: Option<Decimal>,
}

#[derive(FromRow)]
struct DailyPointRow {
    stat_date: NaiveDate,
    value: Option<Decimal>,
    rides_down: Option<i32>,
    avg_wait: Option<Decimal>,
}

/// Chart query handlers.
pub struct Charts {
    pool: PgPool,
}

impl Charts {
    /// Create the handler set.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// LIVE park series: one point per snapshot over the trailing window.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_live(
        &self,
        park_id: i64,
        tz: Tz,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let rows = sqlx::query_as::<_, SnapshotPointRow>(
            "SELECT recorded_at, shame_score, rides_closed, avg_wait_time \
             FROM park_activity_snapshots \
             WHERE park_id = $1 AND recorded_at >= $2 AND recorded_at < $3 \
             ORDER BY recorded_at",
        )
        .bind(park_id)
        .bind(window_start)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut labels = Vec::new();
        let mut data = Vec::new();
        let mut rides_down = Vec::new();
        let mut avg_wait = Vec::new();
        for row in rows {
            labels.push(local_label_hm(tz, row.recorded_at));
            data.push(row.shame_score.and_then(|d| d.to_f64()));
            rides_down.push(Some(row.rides_closed));
            avg_wait.push(row.avg_wait_time.and_then(|d| d.to_f64()));
        }
        Ok(TimeSeriesResponse::new(
            labels,
            data,
            rides_down,
            avg_wait,
            Granularity::Minutes,
        ))
    }

    /// Hourly park series from the hourly aggregates (fast path).
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_hourly(
        &self,
        park_id: i64,
        tz: Tz,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let rows = sqlx::query_as::<_, HourlyPointRow>(
            "SELECT hour_start_utc, shame_score AS value, rides_down, \
                    avg_wait_time_minutes AS avg_wait \
             FROM park_hourly_stats \
             WHERE park_id = $1 AND hour_start_utc >= $2 AND hour_start_utc < $3 \
             ORDER BY hour_start_utc",
        )
        .bind(park_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(hourly_series(rows, tz))
    }

    /// Hourly park series recomputed from raw snapshots (slow path): the
    /// grouped mean of the stamped per-snapshot scores.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_hourly_raw(
        &self,
        park_id: i64,
        tz: Tz,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let park_open = score_sql::park_open("pas");
        let query = format!(
            "SELECT date_trunc('hour', pas.recorded_at) AS hour_start_utc, \
                    ROUND(AVG(CASE WHEN {park_open} THEN pas.shame_score END), 1) AS value, \
                    CAST(ROUND(AVG(CASE WHEN {park_open} THEN pas.rides_closed END)) AS INT4) \
                        AS rides_down, \
                    ROUND(AVG(CASE WHEN {park_open} THEN pas.avg_wait_time END), 2) AS avg_wait \
             FROM park_activity_snapshots pas \
             WHERE pas.park_id = $1 AND pas.recorded_at >= $2 AND pas.recorded_at < $3 \
             GROUP BY date_trunc('hour', pas.recorded_at) \
             ORDER BY hour_start_utc"
        );
        let rows = sqlx::query_as::<_, HourlyPointRow>(&query)
            .bind(park_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(hourly_series(rows, tz))
    }

    /// Daily park series over an inclusive date range.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn park_daily(
        &self,
        park_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let rows = sqlx::query_as::<_, DailyPointRow>(
            "SELECT stat_date, shame_score AS value, rides_with_downtime AS rides_down, \
                    NULL::numeric AS avg_wait \
             FROM park_daily_stats \
             WHERE park_id = $1 AND stat_date >= $2 AND stat_date <= $3 \
             ORDER BY stat_date",
        )
        .bind(park_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(daily_series(rows))
    }

    /// Hourly ride downtime series from the hourly aggregates.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_hourly(
        &self,
        ride_id: i64,
        tz: Tz,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let rows = sqlx::query_as::<_, HourlyPointRow>(
            "SELECT hour_start_utc, downtime_hours AS value, NULL::INT4 AS rides_down, \
                    avg_wait_time_minutes AS avg_wait \
             FROM ride_hourly_stats \
             WHERE ride_id = $1 AND hour_start_utc >= $2 AND hour_start_utc < $3 \
             ORDER BY hour_start_utc",
        )
        .bind(ride_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(hourly_series(rows, tz))
    }

    /// Daily ride downtime series (hours) over an inclusive date range.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub async fn ride_daily(
        &self,
        ride_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<TimeSeriesResponse, QueryError> {
        let rows = sqlx::query_as::<_, DailyPointRow>(
            "SELECT stat_date, ROUND(CAST(downtime_minutes / 60.0 AS numeric), 2) AS value, \
                    NULL::INT4 AS rides_down, avg_wait_time AS avg_wait \
             FROM ride_daily_stats \
             WHERE ride_id = $1 AND stat_date >= $2 AND stat_date <= $3 \
             ORDER BY stat_date",
        )
        .bind(ride_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(daily_series(rows))
    }
}

fn hourly_series(rows: Vec<HourlyPointRow>, tz: Tz) -> TimeSeriesResponse {
    let mut labels = Vec::new();
    let mut data = Vec::new();
    let mut rides_down = Vec::new();
    let mut avg_wait = Vec::new();
    for row in rows {
        let local_hour = local_hour_of(tz, row.hour_start_utc);
        if !(CHART_FIRST_HOUR..=CHART_LAST_HOUR).contains(&local_hour) {
            continue;
        }
        labels.push(format!("{local_hour}:00"));
        data.push(row.value.and_then(|d| d.to_f64()));
        rides_down.push(row.rides_down);
        avg_wait.push(row.avg_wait.and_then(|d| d.to_f64()));
    }
    TimeSeriesResponse::new(labels, data, rides_down, avg_wait, Granularity::Hourly)
}

fn daily_series(rows: Vec<DailyPointRow>) -> TimeSeriesResponse {
    let mut labels = Vec::new();
    let mut data = Vec::new();
    let mut rides_down = Vec::new();
    let mut avg_wait = Vec::new();
    for row in rows {
        labels.push(row.stat_date.format("%m/%d").to_string());
        data.push(row.value.and_then(|d| d.to_f64()));
        rides_down.push(row.rides_down);
        avg_wait.push(row.avg_wait.and_then(|d| d.to_f64()));
    }
    TimeSeriesResponse::new(labels, data, rides_down, avg_wait, Granularity::Daily)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pdt_core::rounding::decimal1;
    use pdt_time::PACIFIC;

    #[test]
    fn test_hourly_series_clips_overnight_hours() {
        // 10:00 UTC is 03:00 Pacific, outside the chart window;
        // 17:00 UTC is 10:00 Pacific, inside it
        let rows = vec![
            HourlyPointRow {
                hour_start_utc: Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap(),
                value: Some(decimal1(1.0)),
                rides_down: Some(1),
                avg_wait: None,
            },
            HourlyPointRow {
                hour_start_utc: Utc.with_ymd_and_hms(2025, 6, 15, 17, 0, 0).unwrap(),
                value: Some(decimal1(4.0)),
                rides_down: Some(2),
                avg_wait: None,
            },
        ];
        let series = hourly_series(rows, PACIFIC);
        assert_eq!(series.labels, vec!["10:00"]);
        assert_eq!(series.data, vec![Some(4.0)]);
        assert_eq!(series.average, Some(4.0));
    }

    #[test]
    fn test_daily_series_labels() {
        let rows = vec![DailyPointRow {
            stat_date: NaiveDate::from_ymd_opt(2025, 6, 14).unwrap(),
            value: Some(decimal1(2.5)),
            rides_down: Some(3),
            avg_wait: None,
        }];
        let series = daily_series(rows);
        assert_eq!(series.labels, vec!["06/14"]);
        assert_eq!(series.granularity, Granularity::Daily);
    }
}
