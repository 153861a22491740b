//! Timestamp extraction and parsing for submission recency filtering.
//!
//! Vendor records carry timestamps under many aliases and in several
//! shapes. Parsing tries an ordered list of interpretations; the order is
//! part of the contract. A record with zero parseable timestamps is
//! treated as "always in range" by callers, so unknown recency never
//! causes silent omission.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Key aliases that may carry a timestamp.
pub const TIMESTAMP_KEYS: [&str; 9] = [
    "submittedAt",
    "submitted_at",
    "submissionTime",
    "submittedOn",
    "createdAt",
    "updatedAt",
    "time",
    "timestamp",
    "date",
];

/// Numeric values above this are epoch milliseconds; at or below, seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 10_000_000_000.0;

/// Naive datetime layouts tried after the self-describing formats, assumed
/// UTC.
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, midnight UTC.
const NAIVE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Parse one JSON value as an absolute instant. Numbers are epoch seconds
/// or milliseconds (split at 1e10); strings go through RFC 3339, RFC 2822,
/// then the naive layouts. Anything else is `None`.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let v = n.as_f64()?;
            if v <= 0.0 {
                return None;
            }
            if v > EPOCH_MILLIS_THRESHOLD {
                Utc.timestamp_millis_opt(v as i64).single()
            } else {
                Utc.timestamp_opt(v as i64, 0).single()
            }
        }
        Value::String(s) => parse_instant_str(s),
        _ => None,
    }
}

fn parse_instant_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for f in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, f) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for f in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, f) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

/// Walk a record and return the latest instant found under any timestamp
/// alias, anywhere in the tree. `None` when nothing parses.
pub fn latest_timestamp(record: &Value) -> Option<DateTime<Utc>> {
    let mut found = Vec::new();
    collect_timestamps(record, &mut found);
    found.into_iter().max()
}

fn collect_timestamps(node: &Value, found: &mut Vec<DateTime<Utc>>) {
    match node {
        Value::Object(map) => {
            for k in TIMESTAMP_KEYS {
                if let Some(dt) = map.get(k).and_then(parse_instant) {
                    found.push(dt);
                }
            }
            for v in map.values() {
                collect_timestamps(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_timestamps(v, found);
            }
        }
        _ => {}
    }
}

/// Recency filter: unknown timestamps are always in range and the cutoff
/// itself is included.
pub fn within_window(ts: Option<DateTime<Utc>>, since: DateTime<Utc>) -> bool {
    ts.map_or(true, |t| t >= since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_seconds_and_millis_agree() {
        let secs = parse_instant(&json!(1_700_000_000)).unwrap();
        let millis = parse_instant(&json!(1_700_000_000_000u64)).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs.timestamp(), 1_700_000_000);
    }

    #[test]
    fn zero_and_negative_numbers_do_not_parse() {
        assert_eq!(parse_instant(&json!(0)), None);
        assert_eq!(parse_instant(&json!(-5)), None);
    }

    #[test]
    fn rfc3339_strings_normalize_to_utc() {
        let dt = parse_instant(&json!("2024-05-01T12:00:00+02:00")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn naive_strings_assume_utc() {
        let dt = parse_instant(&json!("2024-05-01 10:30:00")).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap());

        let date_only = parse_instant(&json!("2024-05-01")).unwrap();
        assert_eq!(date_only, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_strings_do_not_parse() {
        assert_eq!(parse_instant(&json!("not a date")), None);
        assert_eq!(parse_instant(&json!("")), None);
        assert_eq!(parse_instant(&json!(null)), None);
    }

    #[test]
    fn latest_wins_across_nesting() {
        let record = json!({
            "createdAt": "2024-05-01T00:00:00Z",
            "history": [ { "updatedAt": "2024-05-03T00:00:00Z" } ],
            "submittedAt": "2024-05-02T00:00:00Z",
        });
        let latest = latest_timestamp(&record).unwrap();
        assert_eq!(latest, Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn record_without_timestamps_yields_none() {
        assert_eq!(latest_timestamp(&json!({ "studentId": "s1" })), None);
    }

    #[test]
    fn window_includes_unknown_and_boundary() {
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert!(within_window(None, since));
        assert!(within_window(Some(since), since));
        assert!(within_window(Some(since + chrono::Duration::days(1)), since));
        assert!(!within_window(Some(since - chrono::Duration::seconds(1)), since));
    }
}
