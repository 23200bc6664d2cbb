//! Shared utility functions for the vaccination map crates.

/// Date utility functions
pub mod dates {
    use chrono::{DateTime, NaiveDate, NaiveTime};

    /// Calendar format used in CSV fixtures and CLI arguments.
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    const MILLIS_PER_DAY: i64 = 86_400_000;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format(DATE_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)?)
    }

    /// Milliseconds since the Unix epoch at 00:00 UTC on `date`.
    ///
    /// Feature services encode date fields this way.
    pub fn date_to_epoch_millis(date: &NaiveDate) -> i64 {
        date.and_time(NaiveTime::default()).and_utc().timestamp_millis()
    }

    /// Last millisecond of `date` in UTC, used for inclusive day-granular
    /// time filters.
    pub fn end_of_day_epoch_millis(date: &NaiveDate) -> i64 {
        date_to_epoch_millis(date) + MILLIS_PER_DAY - 1
    }

    /// Convert epoch milliseconds back to the UTC calendar date.
    pub fn epoch_millis_to_date(millis: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
    }

    /// Number of whole weeks from `start` to `end` (negative if `end` is earlier).
    pub fn weeks_between(start: &NaiveDate, end: &NaiveDate) -> i64 {
        (*end - *start).num_weeks()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn test_format_and_parse() {
            let date = NaiveDate::from_ymd_opt(2021, 6, 13).unwrap();
            let formatted = format_date(&date);
            assert_eq!(formatted, "2021-06-13");
            let parsed = parse_date(&formatted).unwrap();
            assert_eq!(parsed, date);
        }

        #[test]
        fn test_parse_rejects_compact_dates() {
            assert!(parse_date("20210613").is_err());
        }

        #[test]
        fn test_epoch_millis_round_trip_at_midnight() {
            let date = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
            let millis = date_to_epoch_millis(&date);
            assert_eq!(millis, 1_609_632_000_000);
            assert_eq!(epoch_millis_to_date(millis), Some(date));
        }

        #[test]
        fn test_end_of_day_stays_on_same_date() {
            let date = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
            let end = end_of_day_epoch_millis(&date);
            assert_eq!(epoch_millis_to_date(end), Some(date));
            assert_eq!(
                epoch_millis_to_date(end + 1),
                NaiveDate::from_ymd_opt(2021, 1, 4)
            );
        }

        #[test]
        fn test_weeks_between() {
            let a = NaiveDate::from_ymd_opt(2021, 1, 3).unwrap();
            let b = NaiveDate::from_ymd_opt(2021, 3, 7).unwrap();
            assert_eq!(weeks_between(&a, &b), 9);
            assert_eq!(weeks_between(&b, &a), -9);
        }
    }
}
