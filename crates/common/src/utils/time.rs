use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time elapsed since `since`, rounded down to whole seconds
///
/// Timestamps in the future (clock skew against the broker) count as zero.
pub fn uptime_since(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let secs = (now - since).num_seconds().max(0) as u64;
    Duration::from_secs(secs)
}

/// Render a duration compactly: `42s`, `3m7s`, `5h12m`
pub fn format_uptime(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m", secs / 3600, (secs / 60) % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_uptime() {
        let cases = vec![
            (0, "0s"),
            (59, "59s"),
            (60, "1m0s"),
            (187, "3m7s"),
            (3599, "59m59s"),
            (3600, "1h0m"),
            (18_720, "5h12m"),
            (90_000, "25h0m"),
        ];

        for (secs, expected) in cases {
            assert_eq!(
                format_uptime(Duration::from_secs(secs)),
                expected,
                "Failed for {} seconds",
                secs
            );
        }
    }

    #[test]
    fn test_uptime_since() {
        let attached = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 3, 7).unwrap();
        assert_eq!(uptime_since(attached, now), Duration::from_secs(187));
    }

    #[test]
    fn test_uptime_since_future_is_zero() {
        let attached = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 10).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(uptime_since(attached, now), Duration::ZERO);
    }
}
