//! Pure assembly of one park's snapshots from upstream data.
//!
//! Everything here is deterministic given the fetched payload, the ride
//! roster, and the cycle timestamp, which is what makes the collection-time
//! shame score reproducible during audits.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use pdt_classify::RideClass;
use pdt_core::rounding::{decimal1, decimal2};
use pdt_core::{
    NewParkActivitySnapshot, NewRideStatusSnapshot, Park, Ride, RideCategory, RideId, RideStatus,
};
use pdt_score::{rules, score_at_instant, RideObservation};

use crate::client::ApiRide;

/// The assembled write set for one park's cycle.
#[derive(Debug, Clone)]
pub struct ParkCycle {
    pub park_snapshot: NewParkActivitySnapshot,
    pub ride_snapshots: Vec<NewRideStatusSnapshot>,
    /// Rides observed operating this cycle; their `last_operated_at` gets
    /// refreshed after the write commits.
    pub operated_now: Vec<RideId>,
}

/// Build the ride and park snapshots for one collection cycle.
///
/// Rides absent from the payload produce no snapshot row; gaps are preserved
/// as gaps. `park_appears_open` is the schedule/live-activity disjunction and
/// is stamped onto every ride snapshot of the cycle.
#[must_use]
pub fn build_park_cycle(
    park: &Park,
    rides: &[Ride],
    classes: &HashMap<RideId, RideClass>,
    api_rides: &[(Option<String>, ApiRide)],
    schedule_open: bool,
    recorded_at: DateTime<Utc>,
) -> ParkCycle {
    let by_vendor_id: HashMap<i64, &ApiRide> =
        api_rides.iter().map(|(_, ride)| (ride.id, ride)).collect();

    let mut ride_snapshots = Vec::new();
    let mut operated_now = Vec::new();
    let mut observations = Vec::new();

    let mut rides_open = 0;
    let mut observed = 0;
    let mut wait_sum = 0i64;
    let mut wait_count = 0i64;
    let mut max_wait: Option<i32> = None;

    for ride in rides {
        let Some(api) = by_vendor_id.get(&ride.queue_times_id) else {
            continue;
        };
        observed += 1;

        let status = RideStatus::from_api(api.status.as_deref());
        let computed_is_open = rules::computed_is_open(status, api.wait_time);

        if computed_is_open {
            rides_open += 1;
            operated_now.push(ride.ride_id);
            if let Some(wait) = api.wait_time.filter(|w| *w > 0) {
                wait_sum += i64::from(wait);
                wait_count += 1;
            }
        }
        if let Some(wait) = api.wait_time {
            max_wait = Some(max_wait.map_or(wait, |m| m.max(wait)));
        }

        // Only active attractions (per both the roster and the classifier)
        // enter the shame denominator and numerator.
        let class = classes.get(&ride.ride_id).copied().unwrap_or_else(|| {
            let mut fallback = RideClass::unclassified();
            fallback.category = ride.category;
            fallback
        });
        if ride.counts_for_rankings() && class.category == RideCategory::Attraction {
            observations.push(RideObservation {
                weight: class.weight,
                status,
                computed_is_open,
                last_operated_at: if computed_is_open {
                    Some(recorded_at)
                } else {
                    ride.last_operated_at
                },
            });
        }

        ride_snapshots.push(NewRideStatusSnapshot {
            ride_id: ride.ride_id,
            recorded_at,
            is_open: api.is_open,
            status,
            wait_time: api.wait_time,
            last_updated_api: api.last_updated.unwrap_or(recorded_at),
            computed_is_open,
            // Stamped below once the park decision is known
            park_appears_open: false,
        });
    }

    let park_appears_open = schedule_open || rides_open > 0;
    for snapshot in &mut ride_snapshots {
        snapshot.park_appears_open = park_appears_open;
    }

    let breakdown = score_at_instant(park.operator_semantics(), recorded_at, &observations);

    let avg_wait_time = if wait_count > 0 {
        Some(decimal2(wait_sum as f64 / wait_count as f64))
    } else {
        None
    };

    let park_snapshot = NewParkActivitySnapshot {
        park_id: park.park_id,
        recorded_at,
        total_rides_tracked: rides.len() as i32,
        rides_open,
        rides_closed: observed - rides_open,
        avg_wait_time,
        max_wait_time: max_wait,
        park_appears_open,
        shame_score: Some(decimal1(breakdown.score)),
    };

    ParkCycle {
        park_snapshot,
        ride_snapshots,
        operated_now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pdt_core::ParkId;

    fn park(down_semantics: bool) -> Park {
        Park {
            park_id: ParkId(1),
            queue_times_id: 101,
            name: "Test Park".to_string(),
            city: "Orlando".to_string(),
            state_province: "Florida".to_string(),
            country: "United States".to_string(),
            timezone: "America/New_York".to_string(),
            operator: if down_semantics { "disney" } else { "six flags" }.to_string(),
            is_disney: down_semantics,
            is_universal: false,
            down_semantics,
            is_active: true,
        }
    }

    fn ride(id: i64, vendor_id: i64, tier: i16) -> Ride {
        Ride {
            ride_id: RideId(id),
            queue_times_id: vendor_id,
            park_id: ParkId(1),
            name: format!("Ride {id}"),
            area: None,
            tier: Some(tier),
            category: RideCategory::Attraction,
            is_active: true,
            last_operated_at: None,
        }
    }

    fn classes(entries: &[(i64, i16)]) -> HashMap<RideId, RideClass> {
        entries
            .iter()
            .map(|(id, tier)| {
                (
                    RideId(*id),
                    RideClass {
                        tier: Some(*tier),
                        weight: pdt_core::tier_weight(Some(*tier)),
                        category: RideCategory::Attraction,
                    },
                )
            })
            .collect()
    }

    fn api_ride(id: i64, status: &str, wait: Option<i32>) -> (Option<String>, ApiRide) {
        (
            None,
            ApiRide {
                id,
                name: format!("Ride {id}"),
                is_open: Some(status == "OPERATING"),
                wait_time: wait,
                status: Some(status.to_string()),
                last_updated: None,
            },
        )
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_disney_tier1_down_stamps_shame_six() {
        let rides = vec![ride(1, 11, 1), ride(2, 12, 2)];
        let api = vec![
            api_ride(11, "DOWN", None),
            api_ride(12, "OPERATING", Some(30)),
        ];
        let cycle = build_park_cycle(
            &park(true),
            &rides,
            &classes(&[(1, 1), (2, 2)]),
            &api,
            false,
            at(),
        );

        // weight 3 down over total 5 -> 6.0
        assert_eq!(
            cycle.park_snapshot.shame_score,
            Some(decimal1(6.0))
        );
        assert_eq!(cycle.park_snapshot.rides_open, 1);
        assert_eq!(cycle.park_snapshot.rides_closed, 1);
        assert_eq!(cycle.operated_now, vec![RideId(2)]);
        // Park open via live activity despite no schedule
        assert!(cycle.park_snapshot.park_appears_open);
        assert!(cycle.ride_snapshots.iter().all(|s| s.park_appears_open));
    }

    #[test]
    fn test_non_disney_closed_counts_toward_shame() {
        let rides = vec![ride(1, 11, 2), ride(2, 12, 1)];
        let api = vec![
            api_ride(11, "CLOSED", None),
            api_ride(12, "OPERATING", Some(10)),
        ];
        let cycle = build_park_cycle(
            &park(false),
            &rides,
            &classes(&[(1, 2), (2, 1)]),
            &api,
            false,
            at(),
        );
        // weight 2 closed over total 5 -> 4.0
        assert_eq!(cycle.park_snapshot.shame_score, Some(decimal1(4.0)));
    }

    #[test]
    fn test_missing_ride_is_a_gap_not_a_row() {
        let rides = vec![ride(1, 11, 1), ride(2, 12, 2)];
        let api = vec![api_ride(11, "OPERATING", Some(5))];
        let cycle = build_park_cycle(
            &park(true),
            &rides,
            &classes(&[(1, 1), (2, 2)]),
            &api,
            false,
            at(),
        );
        assert_eq!(cycle.ride_snapshots.len(), 1);
        assert_eq!(cycle.park_snapshot.total_rides_tracked, 2);
        assert_eq!(cycle.park_snapshot.rides_open + cycle.park_snapshot.rides_closed, 1);
    }

    #[test]
    fn test_closed_park_with_schedule_gap() {
        let rides = vec![ride(1, 11, 1)];
        let api = vec![api_ride(11, "CLOSED", None)];
        let cycle = build_park_cycle(
            &park(true),
            &rides,
            &classes(&[(1, 1)]),
            &api,
            false,
            at(),
        );
        assert!(!cycle.park_snapshot.park_appears_open);
        assert!(cycle.ride_snapshots.iter().all(|s| !s.park_appears_open));
    }

    #[test]
    fn test_wait_stats_only_over_open_rides() {
        let rides = vec![ride(1, 11, 1), ride(2, 12, 2), ride(3, 13, 3)];
        let api = vec![
            api_ride(11, "OPERATING", Some(60)),
            api_ride(12, "OPERATING", Some(20)),
            api_ride(13, "DOWN", Some(90)),
        ];
        let cycle = build_park_cycle(
            &park(true),
            &rides,
            &classes(&[(1, 1), (2, 2), (3, 3)]),
            &api,
            true,
            at(),
        );
        // Average over the two operating rides only
        assert_eq!(cycle.park_snapshot.avg_wait_time, Some(decimal2(40.0)));
        // Max over everything, including the stale wait on the down ride
        assert_eq!(cycle.park_snapshot.max_wait_time, Some(90));
    }
}
