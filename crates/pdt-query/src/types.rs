//! Response record types for the query surface.
//!
//! One record type per response shape; the HTTP layer serializes these
//! verbatim.

use serde::Serialize;

use crate::error::QueryError;

/// Data-source attribution carried on every ranking response.
#[derive(Debug, Clone, Serialize)]
pub struct Attribution {
    pub data_source: String,
    pub url: String,
}

impl Default for Attribution {
    fn default() -> Self {
        Self {
            data_source: "Queue-Times.com".to_string(),
            url: "https://queue-times.com/".to_string(),
        }
    }
}

/// Park filter for rankings and charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingFilter {
    AllParks,
    DisneyUniversal,
}

impl RankingFilter {
    /// Parse the query-string form.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for unknown filters.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "all-parks" => Ok(Self::AllParks),
            "disney-universal" => Ok(Self::DisneyUniversal),
            other => Err(QueryError::InvalidParameter {
                name: "filter",
                value: other.to_string(),
            }),
        }
    }

    /// Query-string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllParks => "all-parks",
            Self::DisneyUniversal => "disney-universal",
        }
    }
}

/// Ranking sort key. Secondary sort is always downtime, then id, for
/// deterministic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    ShameScore,
    DowntimeHours,
}

impl SortBy {
    /// Parse the query-string form.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for unknown sort keys.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "shame_score" => Ok(Self::ShameScore),
            "downtime_hours" => Ok(Self::DowntimeHours),
            other => Err(QueryError::InvalidParameter {
                name: "sort_by",
                value: other.to_string(),
            }),
        }
    }

    /// Query-string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ShameScore => "shame_score",
            Self::DowntimeHours => "downtime_hours",
        }
    }
}

/// One park in a ranking listing.
#[derive(Debug, Clone, Serialize)]
pub struct ParkRankingEntry {
    pub rank: u32,
    pub park_id: i64,
    pub park_name: String,
    pub location: String,
    pub shame_score: f64,
    pub total_downtime_hours: f64,
    pub weighted_downtime_hours: f64,
    pub rides_down: i32,
    pub rides_operating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_percentage: Option<f64>,
}

/// One ride in a ranking listing.
#[derive(Debug, Clone, Serialize)]
pub struct RideRankingEntry {
    pub rank: u32,
    pub ride_id: i64,
    pub ride_name: String,
    pub park_name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<i16>,
    pub downtime_hours: f64,
    pub weighted_downtime_hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_percentage: Option<f64>,
}

/// Envelope for every ranking response.
#[derive(Debug, Clone, Serialize)]
pub struct RankingResponse<T> {
    pub success: bool,
    pub period: String,
    pub filter: String,
    pub sort_by: String,
    pub data: Vec<T>,
    pub attribution: Attribution,
}

impl<T> RankingResponse<T> {
    /// Wrap ranked data in the standard envelope.
    #[must_use]
    pub fn new(period: &str, filter: RankingFilter, sort_by: SortBy, data: Vec<T>) -> Self {
        Self {
            success: true,
            period: period.to_string(),
            filter: filter.as_str().to_string(),
            sort_by: sort_by.as_str().to_string(),
            data,
            attribution: Attribution::default(),
        }
    }
}

/// Chart point granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minutes,
    Hourly,
    Daily,
}

/// Time-series response for park and ride charts. Labels are park-local
/// time, computed from UTC.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeriesResponse {
    pub labels: Vec<String>,
    pub data: Vec<Option<f64>>,
    pub rides_down: Vec<Option<i32>>,
    pub avg_wait: Vec<Option<f64>>,
    /// Mean of the non-null data points
    pub average: Option<f64>,
    pub granularity: Granularity,
}

impl TimeSeriesResponse {
    /// Assemble a series, computing the average over non-null points.
    #[must_use]
    pub fn new(
        labels: Vec<String>,
        data: Vec<Option<f64>>,
        rides_down: Vec<Option<i32>>,
        avg_wait: Vec<Option<f64>>,
        granularity: Granularity,
    ) -> Self {
        let points: Vec<f64> = data.iter().flatten().copied().collect();
        let average = if points.is_empty() {
            None
        } else {
            Some(pdt_core::round1(
                points.iter().sum::<f64>() / points.len() as f64,
            ))
        };
        Self {
            labels,
            data,
            rides_down,
            avg_wait,
            average,
            granularity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_and_sort_parse() {
        assert_eq!(
            RankingFilter::parse("all-parks").unwrap(),
            RankingFilter::AllParks
        );
        assert_eq!(
            RankingFilter::parse("disney-universal").unwrap(),
            RankingFilter::DisneyUniversal
        );
        assert!(RankingFilter::parse("six-flags").is_err());

        assert_eq!(SortBy::parse("shame_score").unwrap(), SortBy::ShameScore);
        assert_eq!(
            SortBy::parse("downtime_hours").unwrap(),
            SortBy::DowntimeHours
        );
        assert!(SortBy::parse("name").is_err());
    }

    #[test]
    fn test_ranking_envelope_serialization() {
        let response = RankingResponse::new(
            "today",
            RankingFilter::AllParks,
            SortBy::ShameScore,
            vec![ParkRankingEntry {
                rank: 1,
                park_id: 7,
                park_name: "Magic Kingdom".to_string(),
                location: "Orlando, Florida".to_string(),
                shame_score: 3.0,
                total_downtime_hours: 10.0,
                weighted_downtime_hours: 30.0,
                rides_down: 1,
                rides_operating: 20,
                uptime_percentage: Some(95.0),
            }],
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["period"], "today");
        assert_eq!(json["filter"], "all-parks");
        assert_eq!(json["attribution"]["data_source"], "Queue-Times.com");
        assert_eq!(json["data"][0]["shame_score"], 3.0);
        assert_eq!(json["data"][0]["rank"], 1);
    }

    #[test]
    fn test_time_series_average_skips_nulls() {
        let series = TimeSeriesResponse::new(
            vec!["10:00".to_string(), "11:00".to_string(), "12:00".to_string()],
            vec![Some(2.0), None, Some(4.0)],
            vec![Some(1), None, Some(2)],
            vec![Some(20.0), None, Some(30.0)],
            Granularity::Hourly,
        );
        assert_eq!(series.average, Some(3.0));

        let empty = TimeSeriesResponse::new(vec![], vec![], vec![], vec![], Granularity::Daily);
        assert_eq!(empty.average, None);
    }
}
