//! Flexible statement-date handling.
//!
//! Statements carry dates in whatever format the issuing bank prints, so the
//! parser keeps the raw token and this module turns tokens into chronological
//! sort keys on demand.

use chrono::NaiveDate;

/// Date formats accepted across statement layouts, tried in order.
const FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d %b %Y",
];

/// Parse a date token in any accepted statement format.
pub fn parse_flexible(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// Chronological sort key: milliseconds since the Unix epoch at midnight UTC.
///
/// Unparsable tokens resolve to 0, the earliest key, so dirty rows sort first
/// instead of failing the pipeline.
pub fn sort_key_millis(token: &str) -> i64 {
    parse_flexible(token)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        for token in [
            "2024-01-15",
            "01/15/2024",
            "01/15/24",
            "Jan 15, 2024",
            "January 15, 2024",
            "Jan 15 2024",
            "15 Jan 2024",
        ] {
            assert_eq!(parse_flexible(token), Some(expected), "token {token:?}");
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_flexible("not a date"), None);
        assert_eq!(parse_flexible("13/45/2024"), None);
        assert_eq!(parse_flexible(""), None);
    }

    #[test]
    fn test_sort_key_orders_dates_and_floors_garbage() {
        let early = sort_key_millis("2024-01-01");
        let late = sort_key_millis("2024-06-01");
        assert!(early < late);
        assert_eq!(sort_key_millis("??"), 0);
        assert!(sort_key_millis("??") < early);
    }
}
