//! Audit result and anomaly types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Notable but not concerning; log only
    Info,
    /// Unusual; flag for review
    Warning,
    /// Likely data error; requires review before publishing
    Critical,
}

impl Severity {
    /// Display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One stored-vs-recomputed difference beyond tolerance.
#[derive(Debug, Clone, Serialize)]
pub struct RowMismatch {
    /// Ride or park id
    pub entity_id: i64,
    /// Row key for display ("2025-06-15" or "2025-06-15 17:00")
    pub key: String,
    /// Column that diverged
    pub column: &'static str,
    pub stored: f64,
    pub computed: f64,
    pub delta: f64,
}

/// Verification result for one table on one date or hour.
#[derive(Debug, Clone, Serialize)]
pub struct TableAuditResult {
    pub table: &'static str,
    pub rows_checked: usize,
    pub mismatches: Vec<RowMismatch>,
    /// Row keys that should exist (raw data present) but do not
    pub missing_rows: Vec<String>,
    pub severity: Severity,
}

impl TableAuditResult {
    /// Grade the result: CRITICAL past the mismatch or missing-row
    /// thresholds, WARNING when anything diverged, INFO otherwise.
    #[must_use]
    pub fn graded(
        table: &'static str,
        rows_checked: usize,
        mismatches: Vec<RowMismatch>,
        missing_rows: Vec<String>,
        mismatch_threshold: usize,
        missing_threshold: usize,
    ) -> Self {
        let severity = if mismatches.len() > mismatch_threshold
            || missing_rows.len() > missing_threshold
        {
            Severity::Critical
        } else if mismatches.is_empty() && missing_rows.is_empty() {
            Severity::Info
        } else {
            Severity::Warning
        };
        Self {
            table,
            rows_checked,
            mismatches,
            missing_rows,
            severity,
        }
    }
}

/// A Disney/Universal DOWN hour missing from the hourly aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct DisneyDownViolation {
    pub ride_id: i64,
    pub hour_start_utc: DateTime<Utc>,
    /// What the stored row looked like, if it existed at all
    pub detail: String,
}

/// Result of the snapshot-interval consistency check for one park.
#[derive(Debug, Clone, Serialize)]
pub struct IntervalConsistencyResult {
    pub park_id: i64,
    pub expected_minutes: f64,
    pub median_minutes: Option<f64>,
    pub consistent: bool,
}

/// Full audit report for one local date.
#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub target_date: NaiveDate,
    pub ride_daily: TableAuditResult,
    pub park_daily: TableAuditResult,
    pub ride_hourly: TableAuditResult,
    pub park_hourly: TableAuditResult,
    pub disney_down_violations: Vec<DisneyDownViolation>,
    pub interval_results: Vec<IntervalConsistencyResult>,
    pub overall_severity: Severity,
}

/// Kind of anomaly detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// Value beyond the z-score threshold vs the 30-day baseline
    Zscore,
    /// Large day-over-day change
    SuddenChange,
    /// Missing or implausibly thin data
    DataQuality,
}

impl AnomalyType {
    /// Display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Zscore => "zscore",
            Self::SuddenChange => "sudden_change",
            Self::DataQuality => "data_quality",
        }
    }
}

/// A detected anomaly. Advisory: the UI flags the entity but publishes
/// either way.
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    /// "park" or "ride"
    pub entity_type: &'static str,
    pub entity_id: i64,
    pub entity_name: String,
    pub stat_date: NaiveDate,
    /// Metric that fired ("shame_score", "downtime_hours", ...)
    pub metric: &'static str,
    pub current_value: f64,
    pub expected_value: Option<f64>,
    /// Z-score or percent change that crossed the threshold
    pub threshold: Option<f64>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mismatch(n: usize) -> Vec<RowMismatch> {
        (0..n)
            .map(|i| RowMismatch {
                entity_id: i as i64,
                key: "2025-06-15".to_string(),
                column: "downtime_minutes",
                stored: 10.0,
                computed: 50.0,
                delta: 40.0,
            })
            .collect()
    }

    #[test]
    fn test_grading_clean_is_info() {
        let result = TableAuditResult::graded("ride_daily_stats", 100, vec![], vec![], 10, 5);
        assert_eq!(result.severity, Severity::Info);
    }

    #[test]
    fn test_grading_few_mismatches_is_warning() {
        let result = TableAuditResult::graded("ride_daily_stats", 100, mismatch(3), vec![], 10, 5);
        assert_eq!(result.severity, Severity::Warning);
    }

    #[test]
    fn test_grading_many_mismatches_is_critical() {
        let result =
            TableAuditResult::graded("ride_daily_stats", 100, mismatch(11), vec![], 10, 5);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn test_grading_missing_rows_can_be_critical() {
        let missing = (0..6).map(|i| format!("ride {i}")).collect();
        let result = TableAuditResult::graded("ride_daily_stats", 100, vec![], missing, 10, 5);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
