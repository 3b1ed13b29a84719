//! End-to-end aggregation scenarios over the pure computation layer.
//!
//! Each test builds a full observed window of snapshots and checks the
//! numbers a reader would see, park-type semantics included.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;

use pdt_aggregate::compute::{
    compute_park_day, compute_ride_day, park_open_timeline, SnapObs,
};
use pdt_aggregate::detect_operating_session;
use pdt_core::rounding::{decimal1, decimal2};
use pdt_core::{OperatorSemantics, ParkActivitySnapshot, ParkId, RideId, RideStatus};
use pdt_score::{score_at_instant, RideObservation};
use pdt_time::minute_bucket;

const INTERVAL_MINUTES: u32 = 5;

fn window_start() -> DateTime<Utc> {
    // 02:00 Pacific, well inside one Pacific calendar day
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0).unwrap()
}

fn stat_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

/// Build a ride's observations over `cycles` snapshots from a status closure.
fn ride_observations(
    cycles: usize,
    status_at: impl Fn(usize) -> (Option<RideStatus>, bool),
) -> Vec<SnapObs> {
    (0..cycles)
        .map(|i| {
            let (status, open) = status_at(i);
            SnapObs {
                at: window_start() + Duration::minutes(5 * i as i64),
                status,
                computed_is_open: open,
                wait_time: if open { Some(25) } else { None },
                park_open: true,
            }
        })
        .collect()
}

fn park_snapshots(cycles: usize, shame_at: impl Fn(usize) -> f64) -> Vec<ParkActivitySnapshot> {
    (0..cycles)
        .map(|i| ParkActivitySnapshot {
            snapshot_id: i as i64,
            park_id: ParkId(1),
            recorded_at: window_start() + Duration::minutes(5 * i as i64),
            total_rides_tracked: 2,
            rides_open: 1,
            rides_closed: 1,
            avg_wait_time: Some(decimal2(25.0)),
            max_wait_time: Some(60),
            park_appears_open: true,
            shame_score: Some(decimal1(shame_at(i))),
        })
        .collect()
}

/// Two-ride Disney park, 20 observed hours: the tier-1 ride (weight 3) is
/// DOWN for the first half of the window, the tier-2 ride (weight 2)
/// operates throughout. Expected: shame 3.0, ten downtime hours, one ride
/// with downtime.
#[test]
fn disney_park_with_half_day_tier1_outage() {
    let cycles = 20 * 12; // 20 hours of 5-minute snapshots
    let semantics = OperatorSemantics::DownOnly;

    let tier1 = ride_observations(cycles, |i| {
        if i < cycles / 2 {
            (Some(RideStatus::Down), false)
        } else {
            (Some(RideStatus::Operating), true)
        }
    });
    let tier2 = ride_observations(cycles, |_| (Some(RideStatus::Operating), true));

    let tier1_day = compute_ride_day(RideId(1), stat_date(), &tier1, semantics, INTERVAL_MINUTES, 1);
    let tier2_day = compute_ride_day(RideId(2), stat_date(), &tier2, semantics, INTERVAL_MINUTES, 1);

    assert!(tier1_day.ride_operated);
    assert_eq!(tier1_day.downtime_minutes, 600);
    assert_eq!(tier2_day.downtime_minutes, 0);

    // Per-snapshot shame while the tier-1 ride is down: 3/5 * 10 = 6.0
    let snaps = park_snapshots(cycles, |i| if i < cycles / 2 { 6.0 } else { 0.0 });
    let weights = HashMap::from([(RideId(1), 3), (RideId(2), 2)]);
    let park_day = compute_park_day(
        ParkId(1),
        stat_date(),
        &snaps,
        &[tier1_day, tier2_day],
        &weights,
        20 * 60,
        5.0,
        1,
    );

    assert_eq!(park_day.shame_score, Some(decimal1(3.0)));
    assert_eq!(park_day.total_downtime_hours, decimal2(10.0));
    assert_eq!(park_day.rides_with_downtime, 1);
}

/// Two-ride non-Disney park: the tier-2 ride reports CLOSED for 10% of the
/// window (and operates the rest), the tier-1 ride operates throughout.
/// Expected: shame 0.4, two downtime hours.
#[test]
fn non_disney_park_with_brief_closure() {
    let cycles = 20 * 12;
    let semantics = OperatorSemantics::DownOrClosed;
    let closed_cycles = cycles / 10;

    let tier2 = ride_observations(cycles, |i| {
        if i < closed_cycles {
            (Some(RideStatus::Closed), false)
        } else {
            (Some(RideStatus::Operating), true)
        }
    });
    let tier1 = ride_observations(cycles, |_| (Some(RideStatus::Operating), true));

    let tier2_day = compute_ride_day(RideId(1), stat_date(), &tier2, semantics, INTERVAL_MINUTES, 1);
    let tier1_day = compute_ride_day(RideId(2), stat_date(), &tier1, semantics, INTERVAL_MINUTES, 1);

    assert_eq!(tier2_day.downtime_minutes, 120);
    assert_eq!(tier1_day.downtime_minutes, 0);

    // Per-snapshot shame while the tier-2 ride is closed: 2/5 * 10 = 4.0
    let snaps = park_snapshots(cycles, |i| if i < closed_cycles { 4.0 } else { 0.0 });
    let weights = HashMap::from([(RideId(1), 2), (RideId(2), 3)]);
    let park_day = compute_park_day(
        ParkId(1),
        stat_date(),
        &snaps,
        &[tier2_day, tier1_day],
        &weights,
        20 * 60,
        5.0,
        1,
    );

    assert_eq!(park_day.shame_score, Some(decimal1(0.4)));
    assert_eq!(park_day.total_downtime_hours, decimal2(2.0));
}

/// Schedule-missing park: `park_appears_open` is stamped FALSE everywhere but
/// rides are visibly running. The fallback heuristic must treat the park as
/// open end to end: operating session detected, downtime counted, score
/// positive.
#[test]
fn schedule_gap_falls_back_to_live_activity() {
    let cycles = 6 * 12;

    let mut snaps = park_snapshots(cycles, |_| 6.0);
    for snap in &mut snaps {
        snap.park_appears_open = false; // schedule says closed
        snap.rides_open = 1; // live activity says otherwise
    }

    let session = detect_operating_session(ParkId(1), stat_date(), &snaps, INTERVAL_MINUTES)
        .expect("fallback-open park must have a session");
    assert_eq!(session.operating_minutes, 6 * 60);

    // Ride snapshots resolved through the timeline see the park as open
    let timeline = park_open_timeline(&snaps);
    assert!(timeline.values().all(|open| *open));

    let down_all_window = ride_observations(cycles, |_| (Some(RideStatus::Down), false));
    let operating = ride_observations(cycles, |_| (Some(RideStatus::Operating), true));
    let down_day = compute_ride_day(
        RideId(1),
        stat_date(),
        &down_all_window,
        OperatorSemantics::DownOnly,
        INTERVAL_MINUTES,
        1,
    );
    let up_day = compute_ride_day(
        RideId(2),
        stat_date(),
        &operating,
        OperatorSemantics::DownOnly,
        INTERVAL_MINUTES,
        1,
    );

    let weights = HashMap::from([(RideId(1), 3), (RideId(2), 2)]);
    let park_day = compute_park_day(
        ParkId(1),
        stat_date(),
        &snaps,
        &[down_day, up_day],
        &weights,
        session.operating_minutes,
        5.0,
        1,
    );

    let shame = park_day.shame_score.and_then(|d| d.to_f64()).unwrap_or(0.0);
    assert!(shame > 0.0);
    assert!(park_day.total_downtime_hours > decimal2(0.0));
}

/// Timestamp drift: ride snapshots recorded two seconds after the park
/// snapshot. The minute-bucket join matches 100% of rows where exact
/// equality would match none. Regression guard against reintroducing exact
/// joins.
#[test]
fn two_second_drift_joins_on_the_minute() {
    let snaps = park_snapshots(12, |_| 0.0);
    let timeline = park_open_timeline(&snaps);

    let mut matched = 0;
    let mut exact = 0;
    for (i, park_snap) in snaps.iter().enumerate() {
        let ride_at = park_snap.recorded_at + Duration::seconds(2);
        if timeline.contains_key(&minute_bucket(ride_at)) {
            matched += 1;
        }
        if ride_at == snaps[i].recorded_at {
            exact += 1;
        }
    }
    assert_eq!(matched, 12);
    assert_eq!(exact, 0);
}

/// Zero-denominator park: every ride out for longer than the operated
/// window. Score is exactly 0.0 with no division error, and the park still
/// produces rows.
#[test]
fn deep_offseason_park_scores_zero() {
    let as_of = window_start();
    let observations = vec![
        RideObservation {
            weight: 3,
            status: Some(RideStatus::Closed),
            computed_is_open: false,
            last_operated_at: Some(as_of - Duration::days(30)),
        },
        RideObservation {
            weight: 2,
            status: Some(RideStatus::Closed),
            computed_is_open: false,
            last_operated_at: None,
        },
    ];

    for semantics in [OperatorSemantics::DownOnly, OperatorSemantics::DownOrClosed] {
        let breakdown = score_at_instant(semantics, as_of, &observations);
        assert_eq!(breakdown.effective_weight, 0);
        assert_eq!(breakdown.score, 0.0);
        assert!(breakdown.score.is_finite());
    }

    // The park day row still exists, zeroed
    let closed = ride_observations(12, |_| (Some(RideStatus::Closed), false));
    let day = compute_ride_day(
        RideId(1),
        stat_date(),
        &closed,
        OperatorSemantics::DownOrClosed,
        INTERVAL_MINUTES,
        1,
    );
    assert!(!day.ride_operated);
    assert_eq!(day.downtime_minutes, 0);
}
