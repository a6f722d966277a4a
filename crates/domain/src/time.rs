//! Clock for stamping status events.
//!
//! Events reach SSE subscribers as JSON with RFC 3339 timestamps. Browsers
//! parse those to the millisecond, so stamps are cut to whole milliseconds
//! and survive a JSON round trip unchanged.

use chrono::{DateTime, SubsecRound, Utc};

/// When a status event was observed, in UTC.
pub type Timestamp = DateTime<Utc>;

/// Current time, truncated to whole milliseconds.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_truncate_to_milliseconds() {
        let before = Utc::now().trunc_subsecs(3);
        let ts = now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
        assert!(ts >= before);
        assert!(ts <= Utc::now());
    }

    #[test]
    fn should_survive_json_round_trip() {
        let ts = now();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
