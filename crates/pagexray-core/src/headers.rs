//! Header lookup and the HTTP caching values derived from it.

use crate::har::Header;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

/// Headers keyed by lowercased name
pub type HeaderMap = BTreeMap<String, String>;

lazy_static! {
    // Rejects strings like "0" that a lenient date parser would accept
    static ref HTTP_DATE_PREFIX: Regex = Regex::new(r"^(Mon|Tue|Wed|Thu|Fri|Sat|Sun).+").unwrap();
    static ref MAX_AGE: Regex = Regex::new(r"max-age=(\d+)").unwrap();
    static ref NUMERIC_ZONE: Regex = Regex::new(r"^([+-])(\d{2}):?(\d{2})$").unwrap();
}

const DATE_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S", "%d-%b-%y %H:%M:%S", "%d-%b-%Y %H:%M:%S"];
const ASCTIME_FORMAT: &str = "%b %d %H:%M:%S %Y";

/// Flatten a HAR header list into a map with lowercased names.
///
/// When a name appears more than once the last value wins.
pub fn flatten(headers: &[Header]) -> HeaderMap {
    headers.iter().fold(HeaderMap::new(), |mut result, header| {
        result.insert(header.name.to_lowercase(), header.value.clone());
        result
    })
}

/// Freshness lifetime in seconds.
///
/// `cache-control` decides on its own when present (`no-cache`/`no-store`
/// give 0, otherwise `max-age`, otherwise 0). Only without it is `expires`
/// compared to `now`, which can yield a negative value for stale responses.
pub fn expires(headers: &HeaderMap, now: DateTime<Utc>) -> f64 {
    if let Some(cache_control) = headers.get("cache-control") {
        if cache_control.contains("no-cache") || cache_control.contains("no-store") {
            return 0.0;
        }
        return MAX_AGE
            .captures(cache_control)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .unwrap_or(0.0);
    }

    headers
        .get("expires")
        .and_then(|value| parse_http_date(value))
        .map(|expires| seconds_between(now, expires))
        .unwrap_or(0.0)
}

/// Seconds between `last-modified` and the response `date` (or `now` when
/// the response carries no usable `date`). Returns -1 when `last-modified`
/// is missing or malformed.
pub fn time_since_last_modified(headers: &HeaderMap, now: DateTime<Utc>) -> f64 {
    let Some(last_modified) = headers
        .get("last-modified")
        .and_then(|value| parse_http_date(value))
    else {
        return -1.0;
    };

    let reference = headers
        .get("date")
        .and_then(|value| parse_http_date(value))
        .unwrap_or(now);

    seconds_between(last_modified, reference)
}

/// Parse an HTTP-date in any of the three RFC 7231 forms.
///
/// The weekday must be present but is not checked against the date, and
/// the zone may be `GMT`, `UTC`, `UT`, `Z` or a numeric offset.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if !HTTP_DATE_PREFIX.is_match(value) {
        return None;
    }

    let (_weekday, rest) = value.split_once(|c: char| c == ',' || c.is_whitespace())?;
    // asctime pads single-digit days with a space
    let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Ok(date) = NaiveDateTime::parse_from_str(&rest, ASCTIME_FORMAT) {
        return Some(date.and_utc());
    }

    let (datetime, zone) = rest.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(datetime, format).ok())?;

    naive
        .and_local_timezone(offset)
        .single()
        .map(|date| date.with_timezone(&Utc))
}

fn zone_offset(zone: &str) -> Option<FixedOffset> {
    match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UTC" | "UT" | "Z" => FixedOffset::east_opt(0),
        _ => {
            let caps = NUMERIC_ZONE.captures(zone)?;
            let hours: i32 = caps[2].parse().ok()?;
            let minutes: i32 = caps[3].parse().ok()?;
            let seconds = hours * 3600 + minutes * 60;
            FixedOffset::east_opt(if &caps[1] == "-" { -seconds } else { seconds })
        }
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let list: Vec<Header> = pairs.iter().map(|(n, v)| Header::new(*n, *v)).collect();
        flatten(&list)
    }

    #[test]
    fn test_flatten_lowercases_names() {
        let flat = headers(&[("Cache-Control", "no-cache")]);
        assert_eq!(flat.get("cache-control").map(String::as_str), Some("no-cache"));
        assert!(!flat.contains_key("Cache-Control"));
    }

    #[test]
    fn test_flatten_last_duplicate_wins() {
        let flat = headers(&[("Vary", "Accept"), ("vary", "Origin")]);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["vary"], "Origin");
    }

    #[test]
    fn test_expires_no_store_beats_max_age() {
        let flat = headers(&[("cache-control", "no-store, max-age=600")]);
        assert_eq!(expires(&flat, now()), 0.0);
    }

    #[test]
    fn test_expires_no_cache() {
        let flat = headers(&[("cache-control", "public, no-cache")]);
        assert_eq!(expires(&flat, now()), 0.0);
    }

    #[test]
    fn test_expires_max_age() {
        let flat = headers(&[("cache-control", "max-age=3600")]);
        assert_eq!(expires(&flat, now()), 3600.0);
    }

    #[test]
    fn test_expires_cache_control_without_max_age_ignores_expires() {
        let flat = headers(&[
            ("cache-control", "public"),
            ("expires", "Fri, 01 Mar 2024 13:00:00 GMT"),
        ]);
        assert_eq!(expires(&flat, now()), 0.0);
    }

    #[test]
    fn test_expires_header_relative_to_now() {
        let flat = headers(&[("expires", "Fri, 01 Mar 2024 13:00:00 GMT")]);
        assert_eq!(expires(&flat, now()), 3600.0);
    }

    #[test]
    fn test_expires_in_the_past_is_negative() {
        let flat = headers(&[("expires", "Fri, 01 Mar 2024 11:59:00 GMT")]);
        assert_eq!(expires(&flat, now()), -60.0);
    }

    #[test]
    fn test_expires_invalid_date_is_zero() {
        let flat = headers(&[("expires", "0")]);
        assert_eq!(expires(&flat, now()), 0.0);

        let flat = headers(&[("expires", "-1")]);
        assert_eq!(expires(&flat, now()), 0.0);
    }

    #[test]
    fn test_expires_without_headers_is_zero() {
        assert_eq!(expires(&HeaderMap::new(), now()), 0.0);
    }

    #[test]
    fn test_last_modified_missing() {
        assert_eq!(time_since_last_modified(&HeaderMap::new(), now()), -1.0);
    }

    #[test]
    fn test_last_modified_malformed() {
        let flat = headers(&[("last-modified", "yesterday")]);
        assert_eq!(time_since_last_modified(&flat, now()), -1.0);
    }

    #[test]
    fn test_last_modified_uses_date_header() {
        let flat = headers(&[
            ("last-modified", "Thu, 29 Feb 2024 12:00:00 GMT"),
            ("date", "Thu, 29 Feb 2024 12:01:40 GMT"),
        ]);
        assert_eq!(time_since_last_modified(&flat, now()), 100.0);
    }

    #[test]
    fn test_last_modified_falls_back_to_now() {
        let flat = headers(&[
            ("last-modified", "Thu, 29 Feb 2024 12:00:00 GMT"),
            ("date", "not a date"),
        ]);
        assert_eq!(time_since_last_modified(&flat, now()), 86400.0);
    }

    #[test]
    fn test_parse_http_date_formats() {
        let expected = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Some(expected));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Some(expected));
    }

    #[test]
    fn test_parse_http_date_rejects_missing_weekday() {
        assert_eq!(parse_http_date("06 Nov 1994 08:49:37 GMT"), None);
        assert_eq!(parse_http_date("0"), None);
        assert_eq!(parse_http_date("Sun"), None);
        assert_eq!(parse_http_date("Sunshine all day"), None);
        assert_eq!(parse_http_date(" Fri, 01 Mar 2024 13:00:00 GMT"), None);
    }

    #[test]
    fn test_parse_http_date_ignores_wrong_weekday() {
        // 1 March 2024 is a Friday
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        assert_eq!(parse_http_date("Mon, 01 Mar 2024 13:00:00 GMT"), Some(expected));

        let flat = headers(&[("expires", "Mon, 01 Mar 2024 13:00:00 GMT")]);
        assert_eq!(expires(&flat, now()), 3600.0);
    }

    #[test]
    fn test_parse_http_date_zones() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        assert_eq!(parse_http_date("Fri, 01 Mar 2024 13:00:00 UTC"), Some(expected));
        assert_eq!(parse_http_date("Fri, 01 Mar 2024 13:00:00 UT"), Some(expected));
        assert_eq!(parse_http_date("Fri, 01 Mar 2024 15:00:00 +0200"), Some(expected));
        assert_eq!(parse_http_date("Fri, 01 Mar 2024 08:30:00 -04:30"), Some(expected));
        assert_eq!(parse_http_date("Fri, 01 Mar 2024 13:00:00 CEST"), None);

        let flat = headers(&[
            ("last-modified", "Thu, 29 Feb 2024 12:00:00 UTC"),
            ("date", "Thu, 29 Feb 2024 12:01:40 GMT"),
        ]);
        assert_eq!(time_since_last_modified(&flat, now()), 100.0);
    }
}
