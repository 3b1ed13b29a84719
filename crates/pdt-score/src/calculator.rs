//! The shame-score formula and its effective denominator.
//!
//! `shame = weighted_down / effective_park_weight * 10`, rounded to one
//! decimal, defined as 0.0 when the denominator is zero. The denominator
//! counts only rides that actually operated within the recent window, so a
//! seasonally closed coaster neither pads nor earns shame.

use chrono::{DateTime, Duration, Utc};

use pdt_core::{round1, OperatorSemantics, RideStatus};

use crate::rules;

/// Scale factor: scores live on a 0-10 scale.
pub const SHAME_SCORE_MULTIPLIER: f64 = 10.0;

/// Days of the "has operated recently" window for the denominator.
///
/// Disney/Universal get 7 days: they publish schedules and report
/// `REFURBISHMENT`, so a week of silence is meaningful. Other operators only
/// report `CLOSED`, so 3 days detects seasonal shutdowns faster.
#[must_use]
pub const fn operated_window_days(semantics: OperatorSemantics) -> i64 {
    match semantics {
        OperatorSemantics::DownOnly => 7,
        OperatorSemantics::DownOrClosed => 3,
    }
}

/// Start of the operated window relative to a reference instant.
#[must_use]
pub fn operated_window_start(
    semantics: OperatorSemantics,
    as_of: DateTime<Utc>,
) -> DateTime<Utc> {
    as_of - Duration::days(operated_window_days(semantics))
}

/// Compute a shame score with zero-denominator protection.
///
/// # Example
///
/// ```
/// use pdt_score::shame_score;
///
/// assert_eq!(shame_score(3.0, 5.0), 6.0);
/// assert_eq!(shame_score(0.0, 5.0), 0.0);
/// assert_eq!(shame_score(2.0, 0.0), 0.0); // no eligible rides, no shame
/// ```
#[must_use]
pub fn shame_score(down_weight: f64, effective_park_weight: f64) -> f64 {
    if effective_park_weight <= 0.0 {
        return 0.0;
    }
    round1(down_weight / effective_park_weight * SHAME_SCORE_MULTIPLIER)
}

/// One ride's state at a single instant, as seen by the collector.
#[derive(Debug, Clone)]
pub struct RideObservation {
    /// Tier weight (3/2/1, default 2)
    pub weight: i32,
    pub status: Option<RideStatus>,
    pub computed_is_open: bool,
    /// Including the refresh from this cycle, if the ride is operating now
    pub last_operated_at: Option<DateTime<Utc>>,
}

/// Numerator, denominator, and score for one park at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShameBreakdown {
    pub down_weight: i32,
    pub effective_weight: i32,
    pub score: f64,
}

/// Sum of tier weights for rides inside the operated window.
///
/// Callers pass only active `ATTRACTION` rides; the filter is theirs so the
/// same iterator can feed the full-roster cross-check.
#[must_use]
pub fn effective_park_weight<'a, I>(
    observations: I,
    semantics: OperatorSemantics,
    as_of: DateTime<Utc>,
) -> i32
where
    I: IntoIterator<Item = &'a RideObservation>,
{
    let window_start = operated_window_start(semantics, as_of);
    observations
        .into_iter()
        .filter(|obs| obs.last_operated_at.is_some_and(|at| at >= window_start))
        .map(|obs| obs.weight)
        .sum()
}

/// Legacy full-roster weight (no window). Kept for rollback and for the
/// audit cross-check `effective <= full_roster`.
#[must_use]
pub fn full_roster_weight<'a, I>(observations: I) -> i32
where
    I: IntoIterator<Item = &'a RideObservation>,
{
    observations.into_iter().map(|obs| obs.weight).sum()
}

/// Instantaneous shame for one park from the current cycle's observations.
///
/// This is the value stamped onto `ParkActivitySnapshot.shame_score`; every
/// later consumer averages these stored values rather than recomputing.
#[must_use]
pub fn score_at_instant(
    semantics: OperatorSemantics,
    as_of: DateTime<Utc>,
    observations: &[RideObservation],
) -> ShameBreakdown {
    let effective_weight = effective_park_weight(observations, semantics, as_of);
    let down_weight: i32 = observations
        .iter()
        .filter(|obs| rules::is_down(semantics, obs.status, obs.computed_is_open))
        .map(|obs| obs.weight)
        .sum();

    ShameBreakdown {
        down_weight,
        effective_weight,
        score: shame_score(f64::from(down_weight), f64::from(effective_weight)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use OperatorSemantics::{DownOnly, DownOrClosed};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap()
    }

    fn obs(
        weight: i32,
        status: Option<RideStatus>,
        open: bool,
        operated_days_ago: Option<i64>,
    ) -> RideObservation {
        RideObservation {
            weight,
            status,
            computed_is_open: open,
            last_operated_at: operated_days_ago.map(|d| now() - Duration::days(d)),
        }
    }

    #[test]
    fn test_shame_score_rounding() {
        assert_eq!(shame_score(1.0, 3.0), 3.3);
        assert_eq!(shame_score(5.0, 5.0), 10.0);
        assert_eq!(shame_score(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_operated_window_lengths() {
        assert_eq!(operated_window_days(DownOnly), 7);
        assert_eq!(operated_window_days(DownOrClosed), 3);
    }

    #[test]
    fn test_disney_tier1_down_scores_six() {
        // Tier-1 down (weight 3), tier-2 operating (weight 2): 3/5 * 10 = 6.0
        let observations = vec![
            obs(3, Some(RideStatus::Down), false, Some(0)),
            obs(2, Some(RideStatus::Operating), true, Some(0)),
        ];
        let breakdown = score_at_instant(DownOnly, now(), &observations);
        assert_eq!(breakdown.down_weight, 3);
        assert_eq!(breakdown.effective_weight, 5);
        assert_eq!(breakdown.score, 6.0);
    }

    #[test]
    fn test_non_disney_closed_scores() {
        // Tier-2 closed (weight 2), tier-1 operating (weight 3): 2/5 * 10 = 4.0
        let observations = vec![
            obs(2, Some(RideStatus::Closed), false, Some(0)),
            obs(3, Some(RideStatus::Operating), true, Some(0)),
        ];
        let breakdown = score_at_instant(DownOrClosed, now(), &observations);
        assert_eq!(breakdown.score, 4.0);

        // Same snapshots at a Disney park: CLOSED is scheduled, no shame
        let breakdown = score_at_instant(DownOnly, now(), &observations);
        assert_eq!(breakdown.down_weight, 0);
        assert_eq!(breakdown.score, 0.0);
    }

    #[test]
    fn test_seasonal_ride_leaves_denominator() {
        // Operated 8 days ago: outside the 7-day Disney window
        let observations = vec![
            obs(3, Some(RideStatus::Closed), false, Some(8)),
            obs(2, Some(RideStatus::Operating), true, Some(0)),
        ];
        assert_eq!(effective_park_weight(&observations, DownOnly, now()), 2);
        // 4 days ago is outside the 3-day window for other operators
        let observations = vec![obs(3, Some(RideStatus::Closed), false, Some(4))];
        assert_eq!(effective_park_weight(&observations, DownOrClosed, now()), 0);
    }

    #[test]
    fn test_zero_denominator_park_scores_zero() {
        // Every ride out for longer than the window: score is 0, not NaN
        let observations = vec![
            obs(3, Some(RideStatus::Closed), false, Some(30)),
            obs(2, Some(RideStatus::Closed), false, None),
        ];
        let breakdown = score_at_instant(DownOrClosed, now(), &observations);
        assert_eq!(breakdown.effective_weight, 0);
        assert_eq!(breakdown.score, 0.0);
        assert!(breakdown.score.is_finite());
    }

    #[test]
    fn test_full_roster_weight_is_upper_bound() {
        let observations = vec![
            obs(3, None, false, Some(10)),
            obs(2, None, true, Some(0)),
            obs(1, None, true, Some(1)),
        ];
        let full = full_roster_weight(&observations);
        assert_eq!(full, 6);
        assert!(effective_park_weight(&observations, DownOnly, now()) <= full);
    }
}
