//! Publication date normalization.
//!
//! Feeds in the wild use a handful of date layouts. Each layout is tried in
//! order and the first successful parse wins; anything else yields `None`.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Layouts without a zone, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Layouts tried after a trailing named zone (e.g. `CEST`) has been removed.
/// Two-digit years come first: `%Y` would also accept `06` as year 6.
const NAMED_ZONE_FORMATS: &[&str] = &[
    "%d %b %y %H:%M",
    "%d %b %y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

/// Parses a feed date, returning `None` for empty or unrecognized input.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // RFC 2822 also covers RFC 822/1123 with numeric offsets, UT/GMT and the
    // US zone names. Unknown names shorter than four letters read as -0000.
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }

    parse_with_named_zone(value)
}

/// Zone abbreviations carry no reliable offset, so the wall time is kept as UTC.
fn parse_with_named_zone(value: &str) -> Option<DateTime<Utc>> {
    let (stamp, zone) = value.rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    NAMED_ZONE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(stamp.trim_end(), format).ok())
        .map(|parsed| parsed.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_rfc1123_with_gmt() {
        assert_eq!(
            parse_date("Mon, 02 Jan 2006 15:04:05 GMT"),
            Some(utc(2006, 1, 2, 15, 4, 5))
        );
    }

    #[test]
    fn parses_rfc1123_with_numeric_offset() {
        assert_eq!(
            parse_date("Mon, 02 Jan 2006 15:04:05 -0700"),
            Some(utc(2006, 1, 2, 22, 4, 5))
        );
    }

    #[test]
    fn parses_rfc3339_variants() {
        assert_eq!(
            parse_date("2024-03-01T10:00:00+02:00"),
            Some(utc(2024, 3, 1, 8, 0, 0))
        );
        assert_eq!(
            parse_date("2024-03-01T10:00:00Z"),
            Some(utc(2024, 3, 1, 10, 0, 0))
        );
        assert_eq!(
            parse_date("2024-03-01T10:00:00.250Z").map(|d| d.timestamp()),
            Some(utc(2024, 3, 1, 10, 0, 0).timestamp())
        );
    }

    #[test]
    fn parses_zoneless_timestamps_as_utc() {
        assert_eq!(
            parse_date("2024-03-01 10:00:00"),
            Some(utc(2024, 3, 1, 10, 0, 0))
        );
        assert_eq!(
            parse_date("2024-03-01T10:00:00"),
            Some(utc(2024, 3, 1, 10, 0, 0))
        );
    }

    #[test]
    fn unknown_zone_names_are_treated_as_utc() {
        assert_eq!(
            parse_date("Mon, 02 Jan 2006 15:04:05 CEST"),
            Some(utc(2006, 1, 2, 15, 4, 5))
        );
        assert_eq!(
            parse_date("02 Jan 2006 15:04:05 AEST"),
            Some(utc(2006, 1, 2, 15, 4, 5))
        );
    }

    #[test]
    fn rfc822_short_form_with_zone_name() {
        assert_eq!(
            parse_date("02 Jan 06 15:04 CEST"),
            Some(utc(2006, 1, 2, 15, 4, 0))
        );
        assert_eq!(
            parse_date("02 Jan 06 15:04:05 AEST"),
            Some(utc(2006, 1, 2, 15, 4, 5))
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            parse_date("  Tue, 10 Jun 2003 04:00:00 GMT\n"),
            Some(utc(2003, 6, 10, 4, 0, 0))
        );
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-13-45 99:99:99"), None);
        assert_eq!(parse_date("02 Jan 2006 15:04:05 +12ab"), None);
    }
}
