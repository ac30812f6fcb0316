//! The single normalization point for every time comparison in the system.
//!
//! All instants are UTC, truncated to the millisecond precision the
//! database stores, so a window read back from disk always compares equal
//! to the window that was written.

use chrono::{DateTime, TimeZone, Utc};

/// Normalize an instant to canonical form.
pub fn normalize(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(instant.timestamp_millis())
        .single()
        .expect("millisecond timestamps of valid datetimes always round-trip")
}

/// The current instant, in canonical form.
pub fn now() -> DateTime<Utc> {
    normalize(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn normalize_truncates_below_milliseconds() {
        let precise = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        let normalized = normalize(precise);
        assert_eq!(normalized.timestamp_subsec_millis(), 123);
        assert_eq!(normalized.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn normalize_is_idempotent() {
        let instant = now();
        assert_eq!(instant, normalize(instant));
    }
}
