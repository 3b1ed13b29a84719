//! Statistical anomaly detection over the daily aggregates.
//!
//! Three detectors: z-score against a 30-day baseline, day-over-day sudden
//! change, and data-quality checks for missing or implausibly thin data.
//! Output is advisory.

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AuditError;
use crate::statistics::mean_and_std;
use crate::types::{Anomaly, AnomalyType, Severity};

/// Baseline window length in days.
const BASELINE_DAYS: i64 = 30;
/// Minimum baseline observations before a z-score is meaningful.
const MIN_BASELINE_OBSERVATIONS: usize = 7;
/// Warning and critical z-score thresholds.
const ZSCORE_WARNING: f64 = 3.0;
const ZSCORE_CRITICAL: f64 = 4.0;
/// Ride z-scores only go critical past this much downtime, to avoid noise
/// on small parks.
const RIDE_CRITICAL_MIN_DOWNTIME_HOURS: f64 = 2.0;
/// Day-over-day change threshold, percent.
const SUDDEN_CHANGE_PCT: f64 = 200.0;
/// Floor below which day-over-day ratios divide noise by noise.
const SUDDEN_CHANGE_FLOOR: f64 = 0.1;
/// Ride-count thresholds as a share of the 14-day average.
const RIDE_COUNT_WARNING_RATIO: f64 = 0.5;
const RIDE_COUNT_CRITICAL_RATIO: f64 = 0.25;

#[derive(FromRow)]
struct ParkDayValue {
    park_id: i64,
    park_name: String,
    stat_date: NaiveDate,
    value: Option<Decimal>,
}

#[derive(FromRow)]
struct RideDayValue {
    ride_id: i64,
    ride_name: String,
    park_name: String,
    stat_date: NaiveDate,
    downtime_minutes: i32,
}

#[derive(FromRow)]
struct RideCountRow {
    park_id: i64,
    park_name: String,
    current_rides: i32,
    avg_rides: Decimal,
}

/// Detects statistical anomalies in the daily aggregates.
pub struct AnomalyDetector {
    pool: PgPool,
}

impl AnomalyDetector {
    /// Create a detector over a shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run every detector for a target date.
    ///
    /// # Errors
    /// Returns error if a query fails; individual detectors finding nothing
    /// is not an error.
    pub async fn detect(&self, target_date: NaiveDate) -> Result<Vec<Anomaly>, AuditError> {
        let mut anomalies = Vec::new();
        anomalies.extend(self.park_zscore(target_date).await?);
        anomalies.extend(self.ride_zscore(target_date).await?);
        anomalies.extend(self.sudden_changes(target_date).await?);
        anomalies.extend(self.data_quality(target_date).await?);

        let critical = anomalies
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .count();
        if anomalies.is_empty() {
            info!(%target_date, "No anomalies detected");
        } else {
            warn!(
                %target_date,
                total = anomalies.len(),
                critical,
                "Anomalies detected"
            );
        }
        Ok(anomalies)
    }

    /// Parks whose shame score sits beyond the z-score thresholds vs their
    /// 30-day baseline.
    async fn park_zscore(&self, target_date: NaiveDate) -> Result<Vec<Anomaly>, AuditError> {
        let baseline_start = target_date - Duration::days(BASELINE_DAYS);
        let rows: Vec<ParkDayValue> = sqlx::query_as(
            "SELECT pds.park_id, p.name AS park_name, pds.stat_date, \
                    pds.shame_score AS value \
             FROM park_daily_stats pds \
             JOIN parks p ON pds.park_id = p.park_id \
             WHERE pds.stat_date >= $1 AND pds.stat_date <= $2 \
               AND pds.shame_score IS NOT NULL \
             ORDER BY pds.park_id, pds.stat_date",
        )
        .bind(baseline_start)
        .bind(target_date)
        .fetch_all(&self.pool)
        .await?;

        let mut anomalies = Vec::new();
        for (park_id, park_rows) in group_by_entity(&rows, |r| r.park_id) {
            let park_name = park_rows[0].park_name.clone();
            let baseline: Vec<f64> = park_rows
                .iter()
                .filter(|r| r.stat_date < target_date)
                .filter_map(|r| r.value.as_ref().and_then(Decimal::to_f64))
                .collect();
            let Some(current) = park_rows
                .iter()
                .find(|r| r.stat_date == target_date)
                .and_then(|r| r.value.as_ref().and_then(Decimal::to_f64))
            else {
                continue;
            };
            let Some(z) = zscore(&baseline, current) else {
                continue;
            };
            if z.score.abs() <= ZSCORE_WARNING {
                continue;
            }
            let severity = if z.score.abs() > ZSCORE_CRITICAL {
                Severity::Critical
            } else {
                Severity::Warning
            };
            anomalies.push(Anomaly {
                id: Uuid::new_v4(),
                anomaly_type: AnomalyType::Zscore,
                severity,
                entity_type: "park",
                entity_id: park_id,
                entity_name: park_name,
                stat_date: target_date,
                metric: "shame_score",
                current_value: current,
                expected_value: Some(z.mean),
                threshold: Some(z.score),
                message: format!(
                    "Shame score {current:.2} is {:.1} standard deviations from \
                     30-day mean ({:.2})",
                    z.score.abs(),
                    z.mean
                ),
            });
        }
        Ok(anomalies)
    }

    /// Rides whose downtime spiked beyond the z-score threshold. Critical
    /// additionally requires real downtime, not a small-park blip.
    async fn ride_zscore(&self, target_date: NaiveDate) -> Result<Vec<Anomaly>, AuditError> {
        let baseline_start = target_date - Duration::days(BASELINE_DAYS);
        let rows: Vec<RideDayValue> = sqlx::query_as(
            "SELECT rds.ride_id, r.name AS ride_name, p.name AS park_name, \
                    rds.stat_date, rds.downtime_minutes \
             FROM ride_daily_stats rds \
             JOIN rides r ON rds.ride_id = r.ride_id \
             JOIN parks p ON r.park_id = p.park_id \
             WHERE rds.stat_date >= $1 AND rds.stat_date <= $2 \
             ORDER BY rds.ride_id, rds.stat_date",
        )
        .bind(baseline_start)
        .bind(target_date)
        .fetch_all(&self.pool)
        .await?;

        let mut anomalies = Vec::new();
        for (ride_id, ride_rows) in group_by_entity(&rows, |r| r.ride_id) {
            let baseline: Vec<f64> = ride_rows
                .iter()
                .filter(|r| r.stat_date < target_date)
                .map(|r| f64::from(r.downtime_minutes) / 60.0)
                .collect();
            let Some(current_row) = ride_rows.iter().find(|r| r.stat_date == target_date) else {
                continue;
            };
            let current = f64::from(current_row.downtime_minutes) / 60.0;
            if current <= 0.0 {
                continue;
            }
            let Some(z) = zscore(&baseline, current) else {
                continue;
            };
            if z.score <= ZSCORE_WARNING {
                continue;
            }
            let severity =
                if z.score > ZSCORE_CRITICAL && current > RIDE_CRITICAL_MIN_DOWNTIME_HOURS {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
            anomalies.push(Anomaly {
                id: Uuid::new_v4(),
                anomaly_type: AnomalyType::Zscore,
                severity,
                entity_type: "ride",
                entity_id: ride_id,
                entity_name: format!("{} ({})", current_row.ride_name, current_row.park_name),
                stat_date: target_date,
                metric: "downtime_hours",
                current_value: current,
                expected_value: Some(z.mean),
                threshold: Some(z.score),
                message: format!(
                    "Downtime {current:.2}h is {:.1} standard deviations from \
                     30-day mean ({:.2}h)",
                    z.score, z.mean
                ),
            });
        }
        Ok(anomalies)
    }

    /// Parks whose score moved more than 200% day-over-day.
    async fn sudden_changes(&self, target_date: NaiveDate) -> Result<Vec<Anomaly>, AuditError> {
        let previous_date = target_date - Duration::days(1);
        let rows: Vec<(i64, String, Option<Decimal>, Option<Decimal>)> = sqlx::query_as(
            "SELECT curr.park_id, p.name, curr.shame_score, prev.shame_score \
             FROM park_daily_stats curr \
             JOIN parks p ON curr.park_id = p.park_id \
             JOIN park_daily_stats prev \
               ON curr.park_id = prev.park_id AND prev.stat_date = $2 \
             WHERE curr.stat_date = $1",
        )
        .bind(target_date)
        .bind(previous_date)
        .fetch_all(&self.pool)
        .await?;

        let mut anomalies = Vec::new();
        for (park_id, park_name, current, previous) in rows {
            let (Some(current), Some(previous)) = (
                current.as_ref().and_then(Decimal::to_f64),
                previous.as_ref().and_then(Decimal::to_f64),
            ) else {
                continue;
            };
            // Ratios against tiny numbers are noise, not signal
            if current <= SUDDEN_CHANGE_FLOOR || previous <= SUDDEN_CHANGE_FLOOR {
                continue;
            }
            let pct_change = (current - previous) / previous * 100.0;
            if pct_change.abs() <= SUDDEN_CHANGE_PCT {
                continue;
            }
            let direction = if pct_change > 0.0 {
                "increased"
            } else {
                "decreased"
            };
            anomalies.push(Anomaly {
                id: Uuid::new_v4(),
                anomaly_type: AnomalyType::SuddenChange,
                severity: Severity::Warning,
                entity_type: "park",
                entity_id: park_id,
                entity_name: park_name,
                stat_date: target_date,
                metric: "shame_score",
                current_value: current,
                expected_value: Some(previous),
                threshold: Some(pct_change),
                message: format!(
                    "Shame score {direction} {:.0}% ({previous:.2} -> {current:.2})",
                    pct_change.abs()
                ),
            });
        }
        Ok(anomalies)
    }

    /// Missing day rows for active parks and implausibly low ride counts.
    async fn data_quality(&self, target_date: NaiveDate) -> Result<Vec<Anomaly>, AuditError> {
        let mut anomalies = Vec::new();

        let missing: Vec<(i64, String)> = sqlx::query_as(
            "SELECT p.park_id, p.name FROM parks p \
             WHERE p.is_active = TRUE \
               AND NOT EXISTS ( \
                   SELECT 1 FROM park_daily_stats pds \
                   WHERE pds.park_id = p.park_id AND pds.stat_date = $1 \
               )",
        )
        .bind(target_date)
        .fetch_all(&self.pool)
        .await?;
        for (park_id, park_name) in missing {
            anomalies.push(Anomaly {
                id: Uuid::new_v4(),
                anomaly_type: AnomalyType::DataQuality,
                severity: Severity::Warning,
                entity_type: "park",
                entity_id: park_id,
                entity_name: park_name,
                stat_date: target_date,
                metric: "missing_daily_stats",
                current_value: 0.0,
                expected_value: Some(1.0),
                threshold: None,
                message: "No daily stats recorded (park may be closed)".to_string(),
            });
        }

        let baseline_start = target_date - Duration::days(14);
        let low_counts: Vec<RideCountRow> = sqlx::query_as(
            "WITH park_avg AS ( \
                 SELECT park_id, AVG(total_rides_tracked) AS avg_rides \
                 FROM park_daily_stats \
                 WHERE stat_date >= $2 AND stat_date < $1 \
                 GROUP BY park_id \
                 HAVING AVG(total_rides_tracked) > 5 \
             ) \
             SELECT pds.park_id, p.name AS park_name, \
                    pds.total_rides_tracked AS current_rides, pa.avg_rides \
             FROM park_daily_stats pds \
             JOIN parks p ON pds.park_id = p.park_id \
             JOIN park_avg pa ON pds.park_id = pa.park_id \
             WHERE pds.stat_date = $1 \
               AND pds.total_rides_tracked < pa.avg_rides * 0.5",
        )
        .bind(target_date)
        .bind(baseline_start)
        .fetch_all(&self.pool)
        .await?;
        for row in low_counts {
            let avg = row.avg_rides.to_f64().unwrap_or(0.0);
            let ratio = if avg > 0.0 {
                f64::from(row.current_rides) / avg
            } else {
                0.0
            };
            let severity = if ratio < RIDE_COUNT_CRITICAL_RATIO {
                Severity::Critical
            } else {
                Severity::Warning
            };
            anomalies.push(Anomaly {
                id: Uuid::new_v4(),
                anomaly_type: AnomalyType::DataQuality,
                severity,
                entity_type: "park",
                entity_id: row.park_id,
                entity_name: row.park_name,
                stat_date: target_date,
                metric: "rides_tracked",
                current_value: f64::from(row.current_rides),
                expected_value: Some(avg),
                threshold: Some(RIDE_COUNT_WARNING_RATIO * 100.0),
                message: format!(
                    "Only {} rides tracked ({:.0}% of normal {avg:.0})",
                    row.current_rides,
                    ratio * 100.0
                ),
            });
        }

        Ok(anomalies)
    }
}

struct ZScore {
    score: f64,
    mean: f64,
}

/// Z-score against a baseline; `None` when the baseline is too short or has
/// no spread.
fn zscore(baseline: &[f64], current: f64) -> Option<ZScore> {
    if baseline.len() < MIN_BASELINE_OBSERVATIONS {
        return None;
    }
    let (mean, std) = mean_and_std(baseline)?;
    if std <= f64::EPSILON {
        return None;
    }
    Some(ZScore {
        score: (current - mean) / std,
        mean,
    })
}

fn group_by_entity<T, F: Fn(&T) -> i64>(rows: &[T], key: F) -> Vec<(i64, Vec<&T>)> {
    let mut groups: Vec<(i64, Vec<&T>)> = Vec::new();
    for row in rows {
        let id = key(row);
        match groups.last_mut() {
            Some((last_id, group)) if *last_id == id => group.push(row),
            _ => groups.push((id, vec![row])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zscore_needs_seven_observations() {
        let short = vec![1.0; 6];
        assert!(zscore(&short, 5.0).is_none());
    }

    #[test]
    fn test_zscore_flat_baseline_is_none() {
        let flat = vec![2.0; 10];
        assert!(zscore(&flat, 9.0).is_none());
    }

    #[test]
    fn test_zscore_detects_outlier() {
        let baseline = vec![1.0, 1.2, 0.8, 1.1, 0.9, 1.0, 1.1, 0.9];
        let z = zscore(&baseline, 5.0).unwrap();
        assert!(z.score > ZSCORE_CRITICAL);
        assert!((z.mean - 1.0).abs() < 0.1);

        let normal = zscore(&baseline, 1.05).unwrap();
        assert!(normal.score.abs() < ZSCORE_WARNING);
    }

    #[test]
    fn test_group_by_entity_preserves_order() {
        let rows = vec![(1i64, "a"), (1, "b"), (2, "c")];
        let groups = group_by_entity(&rows, |r| r.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].1.len(), 1);
    }
}
