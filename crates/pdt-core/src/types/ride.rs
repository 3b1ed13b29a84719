//! Ride entity, status enum, and tier weights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::park::ParkId;
use crate::error::DomainError;

/// Ride identifier (internal integer key).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct RideId(pub i64);

impl std::fmt::Display for RideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw ride status as reported by the upstream API.
///
/// Stored nullable: a snapshot with no status at all carries `None` and the
/// derived `computed_is_open` flag decides how it is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Operating,
    Down,
    Closed,
    Refurbishment,
}

impl RideStatus {
    /// Database string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Operating => "OPERATING",
            Self::Down => "DOWN",
            Self::Closed => "CLOSED",
            Self::Refurbishment => "REFURBISHMENT",
        }
    }

    /// Parse an upstream status string. Unrecognized values map to `None`
    /// rather than an error: the API adds statuses without notice.
    #[must_use]
    pub fn from_api(value: Option<&str>) -> Option<Self> {
        match value {
            Some("OPERATING") => Some(Self::Operating),
            Some("DOWN") => Some(Self::Down),
            Some("CLOSED") => Some(Self::Closed),
            Some("REFURBISHMENT") => Some(Self::Refurbishment),
            _ => None,
        }
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ride category. Only `Attraction` feeds rankings and shame calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideCategory {
    Attraction,
    MeetAndGreet,
    Show,
    Experience,
}

impl RideCategory {
    /// Database string for this category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attraction => "ATTRACTION",
            Self::MeetAndGreet => "MEET_AND_GREET",
            Self::Show => "SHOW",
            Self::Experience => "EXPERIENCE",
        }
    }

    /// Parse a database string.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "ATTRACTION" => Ok(Self::Attraction),
            "MEET_AND_GREET" => Ok(Self::MeetAndGreet),
            "SHOW" => Ok(Self::Show),
            "EXPERIENCE" => Ok(Self::Experience),
            other => Err(DomainError::InvalidEnum {
                column: "category",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for RideCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default tier weight where a ride has no classification.
pub const DEFAULT_TIER_WEIGHT: i32 = 2;

/// Map a demand tier to its ranking weight.
///
/// Tier 1 (headliners) weigh 3, tier 2 weighs 2, tier 3 weighs 1. Unknown or
/// unclassified rides get the default weight of 2.
///
/// # Example
///
/// ```
/// use pdt_core::tier_weight;
///
/// assert_eq!(tier_weight(Some(1)), 3);
/// assert_eq!(tier_weight(Some(3)), 1);
/// assert_eq!(tier_weight(None), 2);
/// ```
#[must_use]
pub const fn tier_weight(tier: Option<i16>) -> i32 {
    match tier {
        Some(1) => 3,
        Some(3) => 1,
        _ => DEFAULT_TIER_WEIGHT,
    }
}

/// A ride bound to one park.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ride {
    pub ride_id: RideId,
    /// Upstream vendor id
    pub queue_times_id: i64,
    pub park_id: ParkId,
    pub name: String,
    /// Themed land/area within the park
    pub area: Option<String>,
    /// Demand tier (1 highest, 3 lowest), NULL until classified
    pub tier: Option<i16>,
    pub category: RideCategory,
    pub is_active: bool,
    /// Refreshed whenever a snapshot observes the ride operating; monotonic
    /// non-decreasing. Drives the effective-weight window.
    pub last_operated_at: Option<DateTime<Utc>>,
}

impl Ride {
    /// Whether this ride participates in rankings and shame calculations.
    #[must_use]
    pub fn counts_for_rankings(&self) -> bool {
        self.is_active && self.category == RideCategory::Attraction
    }

    /// Ranking weight for this ride.
    #[must_use]
    pub const fn weight(&self) -> i32 {
        tier_weight(self.tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_weight_mapping() {
        assert_eq!(tier_weight(Some(1)), 3);
        assert_eq!(tier_weight(Some(2)), 2);
        assert_eq!(tier_weight(Some(3)), 1);
        assert_eq!(tier_weight(None), 2);
        assert_eq!(tier_weight(Some(9)), 2);
    }

    #[test]
    fn test_status_from_api() {
        assert_eq!(
            RideStatus::from_api(Some("OPERATING")),
            Some(RideStatus::Operating)
        );
        assert_eq!(RideStatus::from_api(Some("DOWN")), Some(RideStatus::Down));
        assert_eq!(RideStatus::from_api(Some("surprise")), None);
        assert_eq!(RideStatus::from_api(None), None);
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            RideCategory::Attraction,
            RideCategory::MeetAndGreet,
            RideCategory::Show,
            RideCategory::Experience,
        ] {
            assert_eq!(RideCategory::parse(category.as_str()).unwrap(), category);
        }
        assert!(RideCategory::parse("RESTAURANT").is_err());
    }

    #[test]
    fn test_counts_for_rankings() {
        let mut ride = Ride {
            ride_id: RideId(1),
            queue_times_id: 11,
            park_id: ParkId(1),
            name: "Space Mountain".to_string(),
            area: Some("Tomorrowland".to_string()),
            tier: Some(1),
            category: RideCategory::Attraction,
            is_active: true,
            last_operated_at: None,
        };
        assert!(ride.counts_for_rankings());

        ride.category = RideCategory::Show;
        assert!(!ride.counts_for_rankings());

        ride.category = RideCategory::Attraction;
        ride.is_active = false;
        assert!(!ride.counts_for_rankings());
    }
}
