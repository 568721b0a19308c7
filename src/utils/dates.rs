// src/utils/dates.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%m-%d-%Y", "%Y/%m/%d"];

/// Best-effort timestamp parsing for the formats spreadsheets and the
/// dashboard have written over time. Offsets are folded into UTC.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_common_formats() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(parse_date("2026-10-18"), Some(d));
        assert_eq!(parse_date("10/18/2026"), Some(d));
        assert_eq!(parse_date("2026-10-18T23:15:00.000Z"), Some(d));
        assert_eq!(parse_date("2026-10-18 08:00:00"), Some(d));
        assert_eq!(parse_date("sometime next week"), None);
        assert_eq!(parse_date("  "), None);
    }

    #[test]
    fn test_offsets_fold_into_utc() {
        let dt = parse_datetime("2026-10-18T22:00:00-05:00").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    }
}
