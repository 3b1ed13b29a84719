//! Operating-session detection.
//!
//! One session per `(park, local day)`: the first and last UTC instants the
//! park was observed open and the count of open observations scaled to
//! minutes. The session is the canonical denominator for ride uptime.

use chrono::NaiveDate;

use pdt_core::{OperatingSession, ParkActivitySnapshot, ParkId};

/// Detect the operating session for one park day from its snapshots.
/// Returns `None` when the park was never observed open that day.
#[must_use]
pub fn detect_operating_session(
    park_id: ParkId,
    operating_date: NaiveDate,
    park_snapshots: &[ParkActivitySnapshot],
    interval_minutes: u32,
) -> Option<OperatingSession> {
    let open: Vec<&ParkActivitySnapshot> = park_snapshots
        .iter()
        .filter(|s| s.effectively_open())
        .collect();

    let first = open.iter().map(|s| s.recorded_at).min()?;
    let last = open.iter().map(|s| s.recorded_at).max()?;

    Some(OperatingSession {
        park_id,
        operating_date,
        first_open_utc: first,
        last_open_utc: last,
        operating_minutes: open.len() as i32 * interval_minutes as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn snap(minute: i64, open: bool, rides_open: i32) -> ParkActivitySnapshot {
        let base: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 6, 15, 15, 0, 0).unwrap();
        ParkActivitySnapshot {
            snapshot_id: minute,
            park_id: ParkId(1),
            recorded_at: base + Duration::minutes(minute),
            total_rides_tracked: 10,
            rides_open,
            rides_closed: 10 - rides_open,
            avg_wait_time: None,
            max_wait_time: None,
            park_appears_open: open,
            shame_score: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_session_brackets_open_observations() {
        // Closed, then open for an hour, then closed again
        let mut snaps = vec![snap(0, false, 0)];
        snaps.extend((1..=12).map(|i| snap(i * 5, true, 8)));
        snaps.push(snap(65, false, 0));

        let session = detect_operating_session(ParkId(1), date(), &snaps, 5).unwrap();
        assert_eq!(session.first_open_utc, snaps[1].recorded_at);
        assert_eq!(session.last_open_utc, snaps[12].recorded_at);
        assert_eq!(session.operating_minutes, 60);
    }

    #[test]
    fn test_closed_all_day_has_no_session() {
        let snaps: Vec<ParkActivitySnapshot> = (0..12).map(|i| snap(i * 5, false, 0)).collect();
        assert!(detect_operating_session(ParkId(1), date(), &snaps, 5).is_none());
    }

    #[test]
    fn test_fallback_open_counts() {
        // Schedule says closed but rides are running
        let snaps: Vec<ParkActivitySnapshot> = (0..6).map(|i| snap(i * 5, false, 4)).collect();
        let session = detect_operating_session(ParkId(1), date(), &snaps, 5).unwrap();
        assert_eq!(session.operating_minutes, 30);
    }
}
