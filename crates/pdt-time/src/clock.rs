//! Injectable "now" so period boundaries are testable.

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now_utc(), at);
        assert_eq!(clock.now_utc(), at);
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now_utc();
        let b = clock.now_utc();
        assert!(b >= a);
    }
}
