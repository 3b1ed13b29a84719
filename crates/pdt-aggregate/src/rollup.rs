//! Weekly and monthly rollups over daily rows.
//!
//! Pure rollup: no raw snapshots are read. The trend column is the signed
//! percent change in downtime vs the analogous prior period, NULL when the
//! prior period is missing or had zero downtime.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{error, info};

use pdt_core::rounding::decimal2;
use pdt_core::{AggregationType, ParkWeeklyStats, RideWeeklyStats};
use pdt_store::AggregationLogRepository;
use pdt_time::{iso_week_end, iso_week_start, previous_iso_week, previous_month};
use rust_decimal::prelude::ToPrimitive;

use crate::error::AggregateError;
use crate::store::{ParkRollupSums, RideRollupSums, StatsRepository};

/// Period-over-period downtime trend, to two decimals.
///
/// NULL (None) when the previous period has no row or zero downtime; a
/// percent change against zero is undefined, not infinite.
#[must_use]
pub fn trend_pct(current: f64, previous: Option<f64>) -> Option<Decimal> {
    let previous = previous?;
    if previous <= 0.0 {
        return None;
    }
    Some(decimal2((current - previous) / previous * 100.0))
}

fn uptime_pct(sums: &RideRollupSums) -> Decimal {
    if sums.operating_hours_minutes > 0 {
        decimal2(100.0 * sums.uptime_minutes as f64 / sums.operating_hours_minutes as f64)
    } else {
        decimal2(0.0)
    }
}

fn weighted_avg_wait(weighted_sum: Option<Decimal>, operating_minutes: i64) -> Option<Decimal> {
    let sum = weighted_sum?.to_f64()?;
    if operating_minutes <= 0 {
        return None;
    }
    Some(decimal2(sum / operating_minutes as f64))
}

/// Aggregates daily rows into one ISO week.
pub struct WeeklyAggregator {
    stats: StatsRepository,
    log: AggregationLogRepository,
}

impl WeeklyAggregator {
    /// Create an aggregator over a shared pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            stats: StatsRepository::new(pool.clone()),
            log: AggregationLogRepository::new(pool),
        }
    }

    /// Roll up one ISO week. Returns `(parks_processed, rides_processed)`.
    ///
    /// # Errors
    /// Returns error if the week number is invalid or a query fails.
    pub async fn run(&self, year: i32, week_number: u32) -> Result<(i32, i32), AggregateError> {
        let week_start = iso_week_start(year, week_number).ok_or_else(|| {
            AggregateError::Internal(anyhow::anyhow!(
                "invalid ISO week {year}-W{week_number:02}"
            ))
        })?;
        let week_end = iso_week_end(year, week_number).unwrap_or(week_start + Duration::days(6));

        info!(year, week_number, %week_start, "Weekly aggregation starting");
        let log_id = self
            .log
            .start_or_restart(week_start, AggregationType::Weekly)
            .await?;

        match self.rollup_week(year, week_number, week_start, week_end).await {
            Ok((parks, rides)) => {
                self.log.complete(log_id, None, parks, rides).await?;
                info!(year, week_number, parks, rides, "Weekly aggregation complete");
                Ok((parks, rides))
            }
            Err(e) => {
                error!(year, week_number, error = %e, "Weekly aggregation failed");
                self.log.fail(log_id, &e.to_string(), 0, 0).await?;
                Err(e)
            }
        }
    }

    async fn rollup_week(
        &self,
        year: i32,
        week_number: u32,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<(i32, i32), AggregateError> {
        let (prev_year, prev_week) = previous_iso_week(year, week_number);
        let previous_ride_downtime = self
            .stats
            .ride_weekly_downtime(prev_year, prev_week as i32)
            .await?;

        let ride_sums = self.stats.ride_rollup_sums(week_start, week_end).await?;
        let mut rides_processed = 0;
        for sums in &ride_sums {
            let row = RideWeeklyStats {
                ride_id: sums.ride_id,
                year,
                week_number: week_number as i32,
                week_start_date: week_start,
                uptime_minutes: sums.uptime_minutes as i32,
                downtime_minutes: sums.downtime_minutes as i32,
                uptime_percentage: uptime_pct(sums),
                operating_hours_minutes: sums.operating_hours_minutes as i32,
                avg_wait_time: weighted_avg_wait(
                    sums.weighted_wait_sum,
                    sums.operating_hours_minutes,
                ),
                peak_wait_time: sums.peak_wait_time,
                status_changes: sums.status_changes as i32,
                trend_vs_previous: trend_pct(
                    sums.downtime_minutes as f64,
                    previous_ride_downtime
                        .get(&sums.ride_id)
                        .map(|m| f64::from(*m)),
                ),
            };
            self.stats.upsert_ride_weekly(&row).await?;
            rides_processed += 1;
        }

        let previous_park_downtime = self
            .stats
            .park_weekly_downtime(prev_year, prev_week as i32)
            .await?;
        let park_sums = self
            .stats
            .park_weekly_rollup_sums(year, week_number as i32)
            .await?;
        let mut parks_processed = 0;
        for sums in &park_sums {
            let downtime_hours = sums.total_downtime_minutes as f64 / 60.0;
            let row = ParkWeeklyStats {
                park_id: sums.park_id,
                year,
                week_number: week_number as i32,
                week_start_date: week_start,
                total_rides_tracked: sums.total_rides_tracked as i32,
                avg_uptime_percentage: sums.avg_uptime_percentage.map(|d| d.round_dp(2)),
                total_downtime_hours: decimal2(downtime_hours),
                rides_with_downtime: sums.rides_with_downtime as i32,
                avg_wait_time: weighted_avg_wait(
                    sums.weighted_wait_sum,
                    sums.total_operating_minutes,
                ),
                peak_wait_time: sums.peak_wait_time,
                trend_vs_previous: trend_pct(
                    downtime_hours,
                    previous_park_downtime.get(&sums.park_id).copied(),
                ),
            };
            self.stats.upsert_park_weekly(&row).await?;
            parks_processed += 1;
        }

        Ok((parks_processed, rides_processed))
    }
}

/// Aggregates daily rows into one calendar month.
pub struct MonthlyAggregator {
    stats: StatsRepository,
    log: AggregationLogRepository,
}

impl MonthlyAggregator {
    /// Create an aggregator over a shared pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            stats: StatsRepository::new(pool.clone()),
            log: AggregationLogRepository::new(pool),
        }
    }

    /// Roll up one calendar month. Returns `(parks_processed, rides_processed)`.
    ///
    /// # Errors
    /// Returns error if the month is invalid or a query fails.
    pub async fn run(&self, year: i32, month: u32) -> Result<(i32, i32), AggregateError> {
        let month_start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            AggregateError::Internal(anyhow::anyhow!("invalid month {year}-{month:02}"))
        })?;
        let month_end = next_month_start(month_start) - Duration::days(1);

        info!(year, month, "Monthly aggregation starting");
        let log_id = self
            .log
            .start_or_restart(month_start, AggregationType::Monthly)
            .await?;

        match self.rollup_month(year, month, month_start, month_end).await {
            Ok((parks, rides)) => {
                self.log.complete(log_id, None, parks, rides).await?;
                info!(year, month, parks, rides, "Monthly aggregation complete");
                Ok((parks, rides))
            }
            Err(e) => {
                error!(year, month, error = %e, "Monthly aggregation failed");
                self.log.fail(log_id, &e.to_string(), 0, 0).await?;
                Err(e)
            }
        }
    }

    async fn rollup_month(
        &self,
        year: i32,
        month: u32,
        month_start: NaiveDate,
        month_end: NaiveDate,
    ) -> Result<(i32, i32), AggregateError> {
        let (prev_year, prev_month) = previous_month(year, month);
        let previous_ride_downtime = self
            .stats
            .ride_monthly_downtime(prev_year, prev_month as i32)
            .await?;

        let ride_sums = self.stats.ride_rollup_sums(month_start, month_end).await?;
        let mut rides_processed = 0;
        for sums in &ride_sums {
            self.stats
                .upsert_ride_monthly(
                    sums.ride_id,
                    year,
                    month as i32,
                    sums,
                    uptime_pct(sums),
                    weighted_avg_wait(sums.weighted_wait_sum, sums.operating_hours_minutes),
                    trend_pct(
                        sums.downtime_minutes as f64,
                        previous_ride_downtime
                            .get(&sums.ride_id)
                            .map(|m| f64::from(*m)),
                    ),
                )
                .await?;
            rides_processed += 1;
        }

        let previous_park_downtime = self
            .stats
            .park_monthly_downtime(prev_year, prev_month as i32)
            .await?;
        let park_sums = self
            .stats
            .park_monthly_rollup_sums(year, month as i32)
            .await?;
        let mut parks_processed = 0;
        for sums in &park_sums {
            let downtime_hours = sums.total_downtime_minutes as f64 / 60.0;
            self.stats
                .upsert_park_monthly(
                    sums.park_id,
                    year,
                    month as i32,
                    sums,
                    decimal2(downtime_hours),
                    weighted_avg_wait(sums.weighted_wait_sum, sums.total_operating_minutes),
                    trend_pct(
                        downtime_hours,
                        previous_park_downtime.get(&sums.park_id).copied(),
                    ),
                )
                .await?;
            parks_processed += 1;
        }

        Ok((parks_processed, rides_processed))
    }
}

fn next_month_start(month_start: NaiveDate) -> NaiveDate {
    let (year, month) = (month_start.year(), month_start.month());
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap_or(month_start)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap_or(month_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_pct() {
        // 120 vs 100 minutes: +20%
        assert_eq!(trend_pct(120.0, Some(100.0)), Some(decimal2(20.0)));
        assert_eq!(trend_pct(80.0, Some(100.0)), Some(decimal2(-20.0)));
        // Zero or missing previous period: undefined, not infinite
        assert_eq!(trend_pct(50.0, Some(0.0)), None);
        assert_eq!(trend_pct(50.0, None), None);
    }

    #[test]
    fn test_next_month_start() {
        assert_eq!(
            next_month_start(NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
        assert_eq!(
            next_month_start(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_uptime_pct_zero_operating() {
        let sums = RideRollupSums {
            ride_id: pdt_core::RideId(1),
            uptime_minutes: 0,
            downtime_minutes: 0,
            operating_hours_minutes: 0,
            status_changes: 0,
            peak_wait_time: None,
            weighted_wait_sum: None,
        };
        assert_eq!(uptime_pct(&sums), decimal2(0.0));
    }

    #[test]
    fn test_weighted_avg_wait() {
        // 30 min average over 600 operating minutes
        assert_eq!(
            weighted_avg_wait(Some(decimal2(18_000.0)), 600),
            Some(decimal2(30.0))
        );
        assert_eq!(weighted_avg_wait(None, 600), None);
        assert_eq!(weighted_avg_wait(Some(decimal2(100.0)), 0), None);
    }
}
