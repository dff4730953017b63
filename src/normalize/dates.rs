//! Calendar-date parsing for series keys.
//!
//! Series are keyed by whatever the service's `$group` stage produced, so a
//! key may arrive zero-padded, unpadded, slash-separated or as a full
//! timestamp. Comparing those as strings mis-orders them; everything is
//! parsed to a [`NaiveDate`] first.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a date token into a calendar date, or `None` if it is not a date.
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(token)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NAIVE_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date_token("2024-01-01"), Some(d(2024, 1, 1)));
        assert_eq!(parse_date_token(" 2024-12-31 "), Some(d(2024, 12, 31)));
    }

    #[test]
    fn parses_unpadded_and_slashed_dates() {
        assert_eq!(parse_date_token("2024-1-5"), Some(d(2024, 1, 5)));
        assert_eq!(parse_date_token("2024/03/09"), Some(d(2024, 3, 9)));
    }

    #[test]
    fn parses_timestamps() {
        assert_eq!(
            parse_date_token("2024-02-29T23:10:00Z"),
            Some(d(2024, 2, 29))
        );
        assert_eq!(
            parse_date_token("2024-02-29T08:00:00"),
            Some(d(2024, 2, 29))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date_token(""), None);
        assert_eq!(parse_date_token("yesterday"), None);
        assert_eq!(parse_date_token("2024-02-30"), None);
    }
}
