//! DateTime utilities.
//!
//! All persisted timestamps are UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Get the current UTC time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a datetime string into a UTC DateTime.
///
/// Supports RFC 3339, RFC 2822, and naive `YYYY-MM-DD HH:MM:SS` forms
/// (naive values are assumed to be UTC).
pub fn parse_datetime(datetime_str: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(datetime_str)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            DateTime::parse_from_rfc2822(datetime_str).map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .map_err(|e| format!("Failed to parse datetime '{}': {}", datetime_str, e))
}

/// Format a datetime as RFC 3339.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_datetime("2023-12-01T12:30:45Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2023-12-01T12:30:45+00:00");
    }

    #[test]
    fn test_parse_naive_assumes_utc() {
        let dt = parse_datetime("2023-12-01 12:30:45").unwrap();
        assert_eq!(format_datetime(&dt), "2023-12-01T12:30:45+00:00");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_datetime("not a date").is_err());
    }
}
