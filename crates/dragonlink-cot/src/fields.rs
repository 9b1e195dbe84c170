//! Permissive scalar parsing shared by the XML and JSON decoders.
//!
//! Sensor firmware emits whatever it has: empty strings, "nan", floats where
//! integers belong. None of that is allowed to fail a record.

use chrono::{DateTime, Utc};

/// Parses a float, falling back to 0 for garbage and non-finite values.
pub(crate) fn lenient_f64(s: &str) -> f64 {
    lenient_f64_or(s, 0.0)
}

pub(crate) fn lenient_f64_or(s: &str, default: f64) -> f64 {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Parses a byte count. Accepts float text; negatives clamp to 0.
pub(crate) fn lenient_u64(s: &str) -> u64 {
    let s = s.trim();
    if let Ok(v) = s.parse::<u64>() {
        return v;
    }
    float_to_count(lenient_f64(s))
}

pub(crate) fn float_to_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        // `as` saturates at u64::MAX
        v as u64
    } else {
        0
    }
}

pub(crate) fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    s.trim().parse::<DateTime<Utc>>().ok()
}

pub(crate) fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Epoch seconds from either a number or an RFC 3339 instant.
pub(crate) fn lenient_timestamp(s: &str) -> f64 {
    let numeric = lenient_f64_or(s, f64::NAN);
    if numeric.is_finite() {
        return numeric;
    }
    parse_time(s).map(|t| epoch_seconds(&t)).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_f64() {
        assert_eq!(lenient_f64("42.5"), 42.5);
        assert_eq!(lenient_f64(" -71.25 "), -71.25);
        assert_eq!(lenient_f64("abc"), 0.0);
        assert_eq!(lenient_f64(""), 0.0);
        assert_eq!(lenient_f64("NaN"), 0.0);
        assert_eq!(lenient_f64("inf"), 0.0);
        assert_eq!(lenient_f64_or("", 9_999_999.0), 9_999_999.0);
    }

    #[test]
    fn test_lenient_u64() {
        assert_eq!(lenient_u64("1000000"), 1_000_000);
        assert_eq!(lenient_u64("1024.75"), 1024);
        assert_eq!(lenient_u64("-5"), 0);
        assert_eq!(lenient_u64("lots"), 0);
    }

    #[test]
    fn test_lenient_timestamp() {
        assert_eq!(lenient_timestamp("1700000000.5"), 1_700_000_000.5);
        assert_eq!(lenient_timestamp("2024-01-15T10:30:00Z"), 1_705_314_600.0);
        assert_eq!(lenient_timestamp("yesterday"), 0.0);
    }
}
