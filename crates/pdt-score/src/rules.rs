//! Park-type-aware status predicates.
//!
//! Disney and Universal distinguish `DOWN` (broken) from `CLOSED`
//! (scheduled), so only `DOWN` counts as downtime there. Every other operator
//! reports `CLOSED` for all non-operating rides, so `CLOSED` and
//! missing-status-while-closed count as downtime while the park is open.

use pdt_core::{OperatorSemantics, RideStatus};

/// Derived "is this ride open" flag stored on every snapshot.
///
/// TRUE iff the upstream status is `OPERATING`, or the status is missing and
/// a positive wait time was reported.
#[must_use]
pub fn computed_is_open(status: Option<RideStatus>, wait_time: Option<i32>) -> bool {
    match status {
        Some(RideStatus::Operating) => true,
        Some(_) => false,
        None => wait_time.is_some_and(|w| w > 0),
    }
}

/// Whether a snapshot shows the ride in a down state for its operator.
#[must_use]
pub fn is_down(
    semantics: OperatorSemantics,
    status: Option<RideStatus>,
    computed_is_open: bool,
) -> bool {
    match semantics {
        OperatorSemantics::DownOnly => status == Some(RideStatus::Down),
        OperatorSemantics::DownOrClosed => match status {
            Some(RideStatus::Down | RideStatus::Closed) => true,
            Some(_) => false,
            None => !computed_is_open,
        },
    }
}

/// Whether a snapshot counts as evidence the ride operated that day.
///
/// An operating observation always counts. For Disney/Universal operators a
/// `DOWN` report is also a valid signal: a ride can break before its first
/// cycle of the day, and `DOWN` there means "should be running".
#[must_use]
pub fn operated_signal(
    semantics: OperatorSemantics,
    status: Option<RideStatus>,
    computed_is_open: bool,
) -> bool {
    if computed_is_open || status == Some(RideStatus::Operating) {
        return true;
    }
    semantics == OperatorSemantics::DownOnly && status == Some(RideStatus::Down)
}

/// Whether a snapshot accrues downtime.
///
/// A down state only counts while the park is open and the ride has operated
/// at least once during the period under evaluation; otherwise seasonal
/// closures would pollute the rankings.
#[must_use]
pub fn counts_as_downtime(
    semantics: OperatorSemantics,
    status: Option<RideStatus>,
    computed_is_open: bool,
    park_open: bool,
    ride_operated: bool,
) -> bool {
    park_open && ride_operated && is_down(semantics, status, computed_is_open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperatorSemantics::{DownOnly, DownOrClosed};

    #[test]
    fn test_computed_is_open() {
        assert!(computed_is_open(Some(RideStatus::Operating), None));
        assert!(computed_is_open(Some(RideStatus::Operating), Some(0)));
        assert!(!computed_is_open(Some(RideStatus::Down), Some(45)));
        assert!(!computed_is_open(Some(RideStatus::Closed), None));
        // No status, positive wait: upstream says people are queuing
        assert!(computed_is_open(None, Some(15)));
        assert!(!computed_is_open(None, Some(0)));
        assert!(!computed_is_open(None, None));
    }

    #[test]
    fn test_disney_only_down_counts() {
        assert!(is_down(DownOnly, Some(RideStatus::Down), false));
        // CLOSED at Disney means "scheduled", not broken
        assert!(!is_down(DownOnly, Some(RideStatus::Closed), false));
        assert!(!is_down(DownOnly, Some(RideStatus::Refurbishment), false));
        assert!(!is_down(DownOnly, None, false));
    }

    #[test]
    fn test_other_operators_closed_counts() {
        assert!(is_down(DownOrClosed, Some(RideStatus::Down), false));
        assert!(is_down(DownOrClosed, Some(RideStatus::Closed), false));
        assert!(is_down(DownOrClosed, None, false));
        assert!(!is_down(DownOrClosed, None, true));
        assert!(!is_down(DownOrClosed, Some(RideStatus::Operating), true));
        assert!(!is_down(DownOrClosed, Some(RideStatus::Refurbishment), false));
    }

    #[test]
    fn test_operated_signal_disney_down() {
        // A Disney ride reporting DOWN all day still counts as operated
        assert!(operated_signal(DownOnly, Some(RideStatus::Down), false));
        // A non-Disney ride reporting CLOSED all day does not
        assert!(!operated_signal(DownOrClosed, Some(RideStatus::Closed), false));
        assert!(!operated_signal(DownOrClosed, Some(RideStatus::Down), false));
        // Operating counts everywhere
        assert!(operated_signal(DownOrClosed, Some(RideStatus::Operating), true));
        assert!(operated_signal(DownOrClosed, None, true));
    }

    #[test]
    fn test_downtime_requires_open_park_and_operated_ride() {
        let down = Some(RideStatus::Down);
        assert!(counts_as_downtime(DownOnly, down, false, true, true));
        // Park closed: no downtime
        assert!(!counts_as_downtime(DownOnly, down, false, false, true));
        // Ride never operated: seasonal closure, no downtime
        assert!(!counts_as_downtime(DownOnly, down, false, true, false));
    }
}
