//! Calendar-date helpers.
//!
//! The two upstream feeds disagree on date encoding: the CSSE archive names
//! files `MM-DD-YYYY`, while the COVID Tracking API emits compact numeric
//! `YYYYMMDD` values. Everything internal is a `chrono::NaiveDate` (UTC
//! calendar date, no time-of-day ambiguity).

use chrono::NaiveDate;

/// Parse a compact numeric date (`20200315` → 2020-03-15).
pub fn parse_compact(n: u32) -> Option<NaiveDate> {
    let year = (n / 10_000) as i32;
    let month = (n / 100) % 100;
    let day = n % 100;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// The CSSE daily-report file stem for a date (`MM-DD-YYYY`).
pub fn csse_file_stem(date: NaiveDate) -> String {
    date.format("%m-%d-%Y").to_string()
}

/// Today's calendar date in UTC.
pub fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// The next calendar day (saturating at the calendar maximum).
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// Whole days from `a` to `b` (negative when `b` precedes `a`).
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// All calendar dates in `[first, last]`, in order. Empty when `first > last`.
pub fn date_range(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut date = first;
    while date <= last {
        out.push(date);
        date = next_day(date);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_roundtrip() {
        let d = parse_compact(20200315).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2020, 3, 15).unwrap());
        assert_eq!(parse_compact(20200231), None);
    }

    #[test]
    fn iso_parse() {
        assert_eq!(
            parse_iso("2020-01-22"),
            NaiveDate::from_ymd_opt(2020, 1, 22)
        );
        assert_eq!(parse_iso("01-22-2020"), None);
    }

    #[test]
    fn csse_stem_is_month_first() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 22).unwrap();
        assert_eq!(csse_file_stem(d), "01-22-2020");
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let first = NaiveDate::from_ymd_opt(2020, 2, 27).unwrap();
        let last = NaiveDate::from_ymd_opt(2020, 3, 2).unwrap();
        let range = date_range(first, last);
        assert_eq!(range.len(), 5);
        assert_eq!(range.first(), Some(&first));
        assert_eq!(range.last(), Some(&last));
        for pair in range.windows(2) {
            assert_eq!(days_between(pair[0], pair[1]), 1);
        }
        assert!(date_range(last, first).is_empty());
    }
}
