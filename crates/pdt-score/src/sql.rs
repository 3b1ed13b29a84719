//! Centralized SQL fragments for raw-snapshot queries.
//!
//! Every query that computes downtime from `ride_status_snapshots` embeds
//! these fragments instead of writing its own predicates. The park-type-aware
//! DOWN semantics and the park-open fallback heuristic must be identical in
//! every query; divergence here is the most likely correctness failure mode.
//!
//! The fragments mirror the pure predicates in [`crate::rules`]; the tests at
//! the bottom pin the two together.

/// Ride-is-down predicate over a snapshot alias and a parks alias.
///
/// Matches [`crate::rules::is_down`].
#[must_use]
pub fn is_down(rss: &str, parks: &str) -> String {
    format!(
        "(({parks}.down_semantics AND {rss}.status = 'DOWN') \
         OR (NOT {parks}.down_semantics AND ({rss}.status IN ('DOWN', 'CLOSED') \
         OR ({rss}.status IS NULL AND NOT {rss}.computed_is_open))))"
    )
}

/// Park-open filter with the fallback heuristic over a park-snapshot alias.
///
/// Matches [`pdt_core::ParkActivitySnapshot::effectively_open`].
#[must_use]
pub fn park_open(pas: &str) -> String {
    format!("({pas}.park_appears_open OR {pas}.rides_open > 0)")
}

/// Minute-bucket join between ride and park snapshots of the same cycle.
///
/// Ride and park rows may drift by up to two seconds; exact-equality joins
/// are forbidden.
#[must_use]
pub fn minute_join(pas: &str, rss: &str) -> String {
    format!(
        "date_trunc('minute', {pas}.recorded_at) = date_trunc('minute', {rss}.recorded_at)"
    )
}

/// Operated-signal predicate: evidence the ride ran (or, at Disney/Universal,
/// broke) during the period.
///
/// Matches [`crate::rules::operated_signal`].
#[must_use]
pub fn operated_signal(rss: &str, parks: &str) -> String {
    format!(
        "({rss}.computed_is_open OR {rss}.status = 'OPERATING' \
         OR ({parks}.down_semantics AND {rss}.status = 'DOWN'))"
    )
}

/// Tier weight with the default for unclassified rides.
#[must_use]
pub fn tier_weight(rc: &str) -> String {
    format!("COALESCE({rc}.tier_weight, 2)")
}

/// Disney/Universal ranking filter.
#[must_use]
pub fn disney_universal(parks: &str) -> String {
    format!("({parks}.is_disney OR {parks}.is_universal)")
}

/// Operated-window filter for the effective denominator: 7 days for
/// Disney/Universal-semantics parks, 3 days for the rest. `ts_param` is the
/// bind placeholder for the reference timestamp.
#[must_use]
pub fn operated_window(rides: &str, parks: &str, ts_param: &str) -> String {
    format!(
        "{rides}.last_operated_at >= CASE WHEN {parks}.down_semantics \
         THEN {ts_param}::timestamptz - INTERVAL '7 days' \
         ELSE {ts_param}::timestamptz - INTERVAL '3 days' END"
    )
}

/// CTE selecting the distinct rides that operated in `[start, end)` while
/// their park was open. `start_param`/`end_param` are bind placeholders.
#[must_use]
pub fn rides_that_operated_cte(start_param: &str, end_param: &str) -> String {
    format!(
        "rides_that_operated AS (\
         SELECT DISTINCT rss.ride_id \
         FROM ride_status_snapshots rss \
         JOIN rides r ON rss.ride_id = r.ride_id \
         JOIN parks p ON r.park_id = p.park_id \
         JOIN park_activity_snapshots pas ON pas.park_id = p.park_id \
         AND {minute_join} \
         WHERE rss.recorded_at >= {start_param} AND rss.recorded_at < {end_param} \
         AND {park_open} \
         AND {operated})",
        minute_join = minute_join("pas", "rss"),
        park_open = park_open("pas"),
        operated = operated_signal("rss", "p"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_down_mirrors_rules() {
        let sql = is_down("rss", "p");
        // Down-semantics parks: only DOWN
        assert!(sql.contains("p.down_semantics AND rss.status = 'DOWN'"));
        // Other parks: DOWN, CLOSED, or missing-status-while-closed
        assert!(sql.contains("rss.status IN ('DOWN', 'CLOSED')"));
        assert!(sql.contains("rss.status IS NULL AND NOT rss.computed_is_open"));
    }

    #[test]
    fn test_park_open_includes_fallback() {
        let sql = park_open("pas");
        assert!(sql.contains("pas.park_appears_open"));
        assert!(sql.contains("pas.rides_open > 0"));
    }

    #[test]
    fn test_minute_join_never_exact() {
        let sql = minute_join("pas", "rss");
        assert!(sql.contains("date_trunc('minute', pas.recorded_at)"));
        assert!(sql.contains("date_trunc('minute', rss.recorded_at)"));
        // Regression guard: exact-timestamp equality must not come back
        assert!(!sql.contains("pas.recorded_at = rss.recorded_at"));
    }

    #[test]
    fn test_operated_signal_includes_disney_down() {
        let sql = operated_signal("rss", "p");
        assert!(sql.contains("rss.computed_is_open"));
        assert!(sql.contains("p.down_semantics AND rss.status = 'DOWN'"));
    }

    #[test]
    fn test_operated_window_days() {
        let sql = operated_window("r", "p", "$1");
        assert!(sql.contains("INTERVAL '7 days'"));
        assert!(sql.contains("INTERVAL '3 days'"));
        assert!(sql.contains("r.last_operated_at >="));
    }

    #[test]
    fn test_tier_weight_default() {
        assert_eq!(tier_weight("rc"), "COALESCE(rc.tier_weight, 2)");
    }

    #[test]
    fn test_operated_cte_composes_fragments() {
        let cte = rides_that_operated_cte("$1", "$2");
        assert!(cte.starts_with("rides_that_operated AS"));
        assert!(cte.contains(&park_open("pas")));
        assert!(cte.contains(&operated_signal("rss", "p")));
        assert!(cte.contains("rss.recorded_at >= $1"));
        assert!(cte.contains("rss.recorded_at < $2"));
    }
}
