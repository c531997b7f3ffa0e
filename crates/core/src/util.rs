use std::time::Duration;

use chrono::{DateTime, Utc};

/// Rounds `ts` to the nearest multiple of `interval` since the unix epoch.
///
/// Halfway values round up. Sub-millisecond precision is dropped.
pub fn round_to(ts: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = interval.as_millis() as i64;
    if step <= 0 {
        return ts;
    }
    let ms = ts.timestamp_millis();
    let rem = ms.rem_euclid(step);
    let floor = ms - rem;
    let rounded = if rem * 2 >= step { floor + step } else { floor };
    DateTime::from_timestamp_millis(rounded).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap() + chrono::TimeDelta::milliseconds(ms as i64)
    }

    #[test]
    fn rounds_down_below_half() {
        let got = round_to(at(10, 0, 4, 999), Duration::from_secs(10));
        assert_eq!(got, at(10, 0, 0, 0));
    }

    #[test]
    fn rounds_up_at_half() {
        let got = round_to(at(10, 0, 5, 0), Duration::from_secs(10));
        assert_eq!(got, at(10, 0, 10, 0));
    }

    #[test]
    fn exact_multiple_is_unchanged() {
        let got = round_to(at(10, 0, 30, 0), Duration::from_secs(15));
        assert_eq!(got, at(10, 0, 30, 0));
    }

    #[test]
    fn zero_interval_is_identity() {
        let ts = at(1, 2, 3, 456);
        assert_eq!(round_to(ts, Duration::ZERO), ts);
    }
}
