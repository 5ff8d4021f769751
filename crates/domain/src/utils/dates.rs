//! Date boundary normalization and store-date formatting
//!
//! Stored rows carry day-truncated date strings; the search index is queried
//! with epoch-millisecond bounds. All boundary math happens in UTC - the
//! configured display timezone only affects month-bucket labels.

use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};

use crate::constants::EXPORT_MONTH_LEN;

/// Format of stored date strings, "yyyy-MM-dd HH:MM.SS.mmm".
pub const STORE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M.%S%.3f";

/// Truncate to midnight of the same UTC day.
pub fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Midnight of the first day of `at`'s month.
pub fn first_day_of_month(at: DateTime<Utc>) -> DateTime<Utc> {
    let date = at.date_naive();
    let first = date.with_day(1).unwrap_or(date);
    first.and_time(NaiveTime::MIN).and_utc()
}

/// Midnight of the first day of the month before `at`'s.
pub fn first_day_of_last_month(at: DateTime<Utc>) -> DateTime<Utc> {
    let first = first_day_of_month(at);
    first.checked_sub_months(Months::new(1)).unwrap_or(first)
}

/// Render a timestamp as a store date string.
pub fn format_store_date(at: DateTime<Utc>) -> String {
    at.format(STORE_DATE_FORMAT).to_string()
}

/// Keep the "yyyy-MM" prefix of a store date string.
pub fn month_prefix(date: &str) -> &str {
    date.get(..EXPORT_MONTH_LEN).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn store_date_has_day_truncated_shape() {
        let midnight = day_start(utc("2024-01-15T13:45:12Z"));
        assert_eq!(format_store_date(midnight), "2024-01-15 00:00.00.000");
    }

    #[test]
    fn day_start_truncates_to_midnight() {
        assert_eq!(day_start(utc("2024-02-29T23:59:59Z")), utc("2024-02-29T00:00:00Z"));
        assert_eq!(day_start(utc("2024-03-01T00:00:00Z")), utc("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn month_anchors() {
        assert_eq!(first_day_of_month(utc("2024-03-15T10:00:00Z")), utc("2024-03-01T00:00:00Z"));
        assert_eq!(
            first_day_of_last_month(utc("2024-03-15T10:00:00Z")),
            utc("2024-02-01T00:00:00Z")
        );
        // Year boundary
        assert_eq!(
            first_day_of_last_month(utc("2024-01-05T00:00:00Z")),
            utc("2023-12-01T00:00:00Z")
        );
    }

    #[test]
    fn month_prefix_keeps_year_month() {
        assert_eq!(month_prefix("2024-01-15 00:00.00.000"), "2024-01");
        assert_eq!(month_prefix("2024"), "2024");
    }
}
