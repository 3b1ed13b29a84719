//! Rounding helpers shared by every metric producer.
//!
//! Shame scores round to one decimal, hours and percentages to two. The same
//! helpers are used at collection time, during aggregation, and in the audit
//! recomputation so the three paths agree bit-for-bit.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Round to one decimal place (shame scores).
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places (hours, percentages, wait times).
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert to a one-decimal `Decimal` for NUMERIC(3,1) storage.
#[must_use]
pub fn decimal1(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(1)
}

/// Convert to a two-decimal `Decimal` for NUMERIC storage.
#[must_use]
pub fn decimal2(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1() {
        assert_eq!(round1(3.04), 3.0);
        assert_eq!(round1(3.06), 3.1);
        assert_eq!(round1(0.0), 0.0);
        assert_eq!(round1(9.99), 10.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.166_666), 0.17);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(99.994), 99.99);
        assert_eq!(round2(99.996), 100.0);
    }

    #[test]
    fn test_decimal_conversions() {
        assert_eq!(decimal1(3.04).to_string(), "3.0");
        assert_eq!(decimal2(0.166_666).to_string(), "0.17");
    }
}
