// ABOUTME: Duration string parsing for episode lengths.
// ABOUTME: Handles iTunes-style HH:MM:SS, MM:SS, SS and raw Media RSS second counts.

use std::time::Duration;

/// Parses an `itunes:duration` value into a Duration.
///
/// Accepts one, two or three colon-separated components read right to left as
/// seconds, minutes and hours. Missing higher components count as zero.
/// Empty or unparsable input yields a zero duration.
pub fn parse_itunes_duration(s: &str) -> Duration {
    parse_colon_seconds(s)
        .map(Duration::from_secs)
        .unwrap_or(Duration::ZERO)
}

/// Parses a raw seconds count such as a Media RSS `duration` attribute.
/// Negative or unparsable values yield a zero duration.
pub fn parse_seconds(s: &str) -> Duration {
    let secs = s.trim().parse::<i64>().unwrap_or(0);
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

fn parse_colon_seconds(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut total: u64 = 0;
    // Seconds, minutes, hours.
    for (part, scale) in parts.iter().rev().zip([1u64, 60, 3600]) {
        let value: u64 = part.trim().parse().ok()?;
        total = total.checked_add(value.checked_mul(scale)?)?;
    }
    Some(total)
}
