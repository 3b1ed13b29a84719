//! Park entity and operator semantics.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Park identifier (internal integer key).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ParkId(pub i64);

impl std::fmt::Display for ParkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an operator reports breakdowns.
///
/// Disney and Universal publish a schedule and distinguish `DOWN` (broken)
/// from `CLOSED` (scheduled). Most other operators only ever report `CLOSED`,
/// so a closed ride in an open park has to count as a breakdown there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorSemantics {
    /// Only `status='DOWN'` counts as downtime.
    DownOnly,
    /// `DOWN`, `CLOSED`, and missing-status-while-closed all count.
    DownOrClosed,
}

/// A theme park tracked by the collector.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Park {
    /// Internal id
    pub park_id: ParkId,
    /// Upstream vendor id
    pub queue_times_id: i64,
    /// Display name
    pub name: String,
    pub city: String,
    pub state_province: String,
    pub country: String,
    /// IANA timezone name (e.g. "America/Los_Angeles")
    pub timezone: String,
    /// Operator name, lowercased (e.g. "disney", "six flags")
    pub operator: String,
    pub is_disney: bool,
    pub is_universal: bool,
    /// Derived from the configured operator list at sync time; the single
    /// flag every query and predicate reads.
    pub down_semantics: bool,
    /// Inactive parks contribute no observations and are excluded from rankings.
    pub is_active: bool,
}

impl Park {
    /// Breakdown-reporting semantics for this park.
    #[must_use]
    pub const fn operator_semantics(&self) -> OperatorSemantics {
        if self.down_semantics {
            OperatorSemantics::DownOnly
        } else {
            OperatorSemantics::DownOrClosed
        }
    }

    /// "City, State" display location.
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}, {}", self.city, self.state_province)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn park(down_semantics: bool) -> Park {
        Park {
            park_id: ParkId(1),
            queue_times_id: 101,
            name: "Magic Kingdom".to_string(),
            city: "Orlando".to_string(),
            state_province: "Florida".to_string(),
            country: "United States".to_string(),
            timezone: "America/New_York".to_string(),
            operator: "disney".to_string(),
            is_disney: true,
            is_universal: false,
            down_semantics,
            is_active: true,
        }
    }

    #[test]
    fn test_operator_semantics() {
        assert_eq!(
            park(true).operator_semantics(),
            OperatorSemantics::DownOnly
        );
        assert_eq!(
            park(false).operator_semantics(),
            OperatorSemantics::DownOrClosed
        );
    }

    #[test]
    fn test_location() {
        assert_eq!(park(true).location(), "Orlando, Florida");
    }
}
