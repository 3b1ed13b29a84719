//! Classification record types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use pdt_core::{tier_weight, ParkId, RideCategory, RideId};

/// Persisted classifier output for one ride.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Classification {
    pub ride_id: RideId,
    pub park_id: ParkId,
    pub tier: i16,
    pub tier_weight: i16,
    pub category: RideCategory,
    /// Classifier confidence (0.0 to 1.0)
    pub confidence: Option<Decimal>,
    /// Classifier reasoning text
    pub reasoning: Option<String>,
    /// Source citations from the research pipeline
    pub research_sources: Option<Value>,
    /// Bumped when the classifier's output format changes; invalidates the
    /// whole cache
    pub schema_version: i32,
    pub classified_at: DateTime<Utc>,
}

/// Human override for one ride; wins over classifier output.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassificationOverride {
    pub ride_id: RideId,
    pub tier: Option<i16>,
    pub category: Option<RideCategory>,
    pub note: Option<String>,
}

/// Resolved classification the rest of the system consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideClass {
    /// Demand tier, `None` for unclassified rides
    pub tier: Option<i16>,
    /// Ranking weight (3/2/1, default 2)
    pub weight: i32,
    pub category: RideCategory,
}

impl RideClass {
    /// The fallback for rides with no classification at all. Missing
    /// classification is never an error.
    #[must_use]
    pub const fn unclassified() -> Self {
        Self {
            tier: None,
            weight: tier_weight(None),
            category: RideCategory::Attraction,
        }
    }

    /// Resolve classifier output and an optional override into the final
    /// lookup value.
    #[must_use]
    pub fn resolve(
        classification: Option<&Classification>,
        human: Option<&ClassificationOverride>,
    ) -> Self {
        let tier = human
            .and_then(|o| o.tier)
            .or_else(|| classification.map(|c| c.tier));
        let category = human
            .and_then(|o| o.category)
            .or_else(|| classification.map(|c| c.category))
            .unwrap_or(RideCategory::Attraction);
        // Weight follows the resolved tier, not the stored tier_weight, when
        // a human override changes the tier.
        let weight = match (human.and_then(|o| o.tier), classification) {
            (Some(tier), _) => tier_weight(Some(tier)),
            (None, Some(c)) => i32::from(c.tier_weight),
            (None, None) => tier_weight(None),
        };
        Self {
            tier,
            weight,
            category,
        }
    }
}

impl Default for RideClass {
    fn default() -> Self {
        Self::unclassified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(tier: i16, weight: i16) -> Classification {
        Classification {
            ride_id: RideId(1),
            park_id: ParkId(1),
            tier,
            tier_weight: weight,
            category: RideCategory::Attraction,
            confidence: None,
            reasoning: None,
            research_sources: None,
            schema_version: 1,
            classified_at: Utc::now(),
        }
    }

    #[test]
    fn test_unclassified_defaults() {
        let class = RideClass::unclassified();
        assert_eq!(class.tier, None);
        assert_eq!(class.weight, 2);
        assert_eq!(class.category, RideCategory::Attraction);
    }

    #[test]
    fn test_resolve_prefers_override() {
        let cached = classification(3, 1);
        let human = ClassificationOverride {
            ride_id: RideId(1),
            tier: Some(1),
            category: None,
            note: Some("headliner, classifier keeps missing it".to_string()),
        };
        let class = RideClass::resolve(Some(&cached), Some(&human));
        assert_eq!(class.tier, Some(1));
        assert_eq!(class.weight, 3);
        assert_eq!(class.category, RideCategory::Attraction);
    }

    #[test]
    fn test_resolve_classifier_only() {
        let cached = classification(2, 2);
        let class = RideClass::resolve(Some(&cached), None);
        assert_eq!(class.tier, Some(2));
        assert_eq!(class.weight, 2);
    }

    #[test]
    fn test_resolve_category_override() {
        let mut cached = classification(2, 2);
        cached.category = RideCategory::Attraction;
        let human = ClassificationOverride {
            ride_id: RideId(1),
            tier: None,
            category: Some(RideCategory::Show),
            note: None,
        };
        let class = RideClass::resolve(Some(&cached), Some(&human));
        assert_eq!(class.category, RideCategory::Show);
        // Tier/weight untouched by a category-only override
        assert_eq!(class.weight, 2);
    }

    #[test]
    fn test_round_trip_serialization() {
        let cached = classification(1, 3);
        let json = serde_json::to_string(&cached).unwrap();
        let back: Classification = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tier, cached.tier);
        assert_eq!(back.tier_weight, cached.tier_weight);
        assert_eq!(back.category, cached.category);
    }
}
