// ABOUTME: Date parsing for RSS/Atom feed timestamps.
// ABOUTME: RFC-822 style parsing first, then a generic fallback, then UNSET_TIMESTAMP.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::UNSET_TIMESTAMP;

/// Resolves a feed date string, never failing.
///
/// Tries [`parse_rfc822`] first and [`parse_fallback`] second. When neither
/// understands the text the result is [`UNSET_TIMESTAMP`].
pub fn parse_feed_date(s: &str) -> DateTime<Utc> {
    parse_rfc822(s)
        .or_else(|| parse_fallback(s))
        .unwrap_or(UNSET_TIMESTAMP)
}

/// Parses RFC-822/RFC-2822 dates as found in RSS `pubDate` and `lastBuildDate`.
///
/// Handles numeric offsets, the obsolete US zone names, optional weekdays,
/// single-digit days and the regional abbreviations feeds commonly emit.
pub fn parse_rfc822(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Zone names go first: chrono reads unknown abbreviations as +0000.
    if let Some(dt) = parse_with_named_timezone(s) {
        return Some(dt);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats_with_tz = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%a, %e %b %Y %H:%M:%S %z",
        "%a, %d %b %Y %H:%M %z",
        "%d %b %Y %H:%M:%S %z",
        "%e %b %Y %H:%M:%S %z",
        "%a, %d %B %Y %H:%M:%S %z",
    ];

    for fmt in &formats_with_tz {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    None
}

/// Generic fallback for everything that is not RFC-822: ISO 8601 variants,
/// naive timestamps (taken as UTC), bare dates and looser natural formats.
pub fn parse_fallback(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats_with_tz = ["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%z"];
    for fmt in &formats_with_tz {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let formats_naive = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%e %b %Y %H:%M:%S",
        "%a, %d %b %Y %H:%M:%S",
    ];
    for fmt in &formats_naive {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // Date-only forms resolve to midnight UTC so the day never shifts.
    let formats_date = ["%Y-%m-%d", "%d %b %Y", "%b %e, %Y", "%B %e, %Y"];
    for fmt in &formats_date {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    dateparser::parse_with_timezone(s, &Utc).ok()
}

/// Parses datetime strings ending in a named timezone (PST, CEST, JST, ...).
/// chrono's %Z does not parse these, so the abbreviation is mapped by hand.
fn parse_with_named_timezone(s: &str) -> Option<DateTime<Utc>> {
    let (base, zone) = s.rsplit_once(' ')?;
    let offset_secs = named_zone_offset(zone)?;

    let formats = [
        "%a, %d %b %Y %H:%M:%S",
        "%a, %e %b %Y %H:%M:%S",
        "%a, %d %b %Y %H:%M",
        "%d %b %Y %H:%M:%S",
        "%e %b %Y %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(base.trim_end(), fmt) {
            let offset = FixedOffset::east_opt(offset_secs)?;
            let dt = offset.from_local_datetime(&naive).single()?;
            return Some(dt.with_timezone(&Utc));
        }
    }

    None
}

fn named_zone_offset(zone: &str) -> Option<i32> {
    const HOUR: i32 = 3600;
    let offset = match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UTC" | "UT" | "Z" | "WET" => 0,
        "EST" => -5 * HOUR,
        "EDT" => -4 * HOUR,
        "CST" => -6 * HOUR,
        "CDT" => -5 * HOUR,
        "MST" => -7 * HOUR,
        "MDT" => -6 * HOUR,
        "PST" => -8 * HOUR,
        "PDT" => -7 * HOUR,
        "AKST" => -9 * HOUR,
        "AKDT" => -8 * HOUR,
        "HST" => -10 * HOUR,
        "AST" => -4 * HOUR,
        "ADT" => -3 * HOUR,
        "NST" => -(3 * HOUR + 1800),
        "WEST" | "CET" | "BST" | "MET" => HOUR,
        "CEST" | "EET" | "MEST" => 2 * HOUR,
        "EEST" | "MSK" => 3 * HOUR,
        "IST" => 5 * HOUR + 1800,
        "JST" | "KST" => 9 * HOUR,
        "AWST" => 8 * HOUR,
        "AEST" => 10 * HOUR,
        "AEDT" => 11 * HOUR,
        "NZST" => 12 * HOUR,
        "NZDT" => 13 * HOUR,
        _ => return None,
    };
    Some(offset)
}
