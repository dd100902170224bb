//! Calendar-day keys and week/month ranges.
//!
//! A date key is the `YYYY-MM-DD` form of a local calendar day. Naive inputs
//! keep their own calendar day; only inputs carrying an explicit offset are
//! converted to the local timezone first.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, TimeZone};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn to_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Calendar day of a timestamp in `tz`.
pub fn date_key_in<Tz: TimeZone>(instant: &DateTime<Tz>, tz: &Tz) -> String {
    to_date_key(instant.with_timezone(tz).date_naive())
}

/// Parse any accepted date input into its calendar day.
///
/// Accepts:
/// - `YYYY-MM-DD`
/// - naive datetime `YYYY-MM-DDTHH:MM:SS[.f]` (or with a space separator)
/// - RFC 3339 datetime, converted to the local calendar day
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_KEY_FORMAT) {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.date());
        }
    }
    None
}

/// Normalise a date or datetime string to a date key.
pub fn date_key(input: &str) -> Option<String> {
    parse_day(input).map(to_date_key)
}

/// Monday on or before `date` (ISO weeks; Sunday belongs to the week that began six days earlier).
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date - Days::new(offset)
}

pub fn week_start_key(date: NaiveDate) -> String {
    to_date_key(week_start(date))
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// First and last calendar day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first);
    let last = next_month.pred_opt().unwrap_or(first);
    (first, last)
}

/// Monday..Sunday of the ISO week before the one containing `today`.
pub fn previous_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let this_monday = week_start(today);
    (this_monday - Days::new(7), this_monday - Days::new(1))
}

/// Inclusive range covering the last `days` days up to `today`.
pub fn days_back(today: NaiveDate, days: u64) -> (NaiveDate, NaiveDate) {
    (today - Days::new(days), today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Weekday};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_KEY_FORMAT).unwrap()
    }

    #[test]
    fn date_key_accepts_plain_and_naive_datetime() {
        assert_eq!(date_key("2026-03-02").unwrap(), "2026-03-02");
        assert_eq!(date_key("2026-03-02T23:59:59").unwrap(), "2026-03-02");
        assert_eq!(date_key("2026-03-02 00:00:00.123").unwrap(), "2026-03-02");
    }

    #[test]
    fn date_key_rejects_garbage() {
        assert!(date_key("not-a-date").is_none());
        assert!(date_key("2026-02-30").is_none());
    }

    #[test]
    fn date_key_is_idempotent() {
        for input in ["2026-01-01", "2025-12-31T22:10:00", "2026-07-04T12:00:00+00:00"] {
            let once = date_key(input).unwrap();
            assert_eq!(date_key(&once).unwrap(), once);
        }
    }

    #[test]
    fn offset_timestamps_use_the_target_calendar_day() {
        let utc_late = DateTime::parse_from_rfc3339("2026-03-01T23:30:00Z").unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(date_key_in(&utc_late, &plus_two), "2026-03-02");
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(date_key_in(&utc_late, &minus_five), "2026-03-01");
    }

    #[test]
    fn week_start_maps_sunday_back_six_days() {
        // 2026-03-08 is a Sunday
        assert_eq!(week_start_key(d("2026-03-08")), "2026-03-02");
        assert_eq!(week_start_key(d("2026-03-02")), "2026-03-02");
        assert_eq!(week_start_key(d("2026-03-04")), "2026-03-02");
    }

    #[test]
    fn week_start_is_monday_and_idempotent() {
        let mut day = d("2025-12-20");
        for _ in 0..30 {
            let monday = week_start(day);
            assert_eq!(monday.weekday(), Weekday::Mon);
            assert_eq!(week_start(monday), monday);
            assert!(monday <= day);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn month_bounds_handles_leap_february() {
        assert_eq!(month_bounds(d("2028-02-10")), (d("2028-02-01"), d("2028-02-29")));
        assert_eq!(month_bounds(d("2026-12-31")), (d("2026-12-01"), d("2026-12-31")));
    }

    #[test]
    fn previous_week_spans_monday_to_sunday() {
        // Wednesday 2026-03-11
        assert_eq!(previous_week(d("2026-03-11")), (d("2026-03-02"), d("2026-03-08")));
    }

    #[test]
    fn days_back_is_inclusive_range() {
        assert_eq!(days_back(d("2026-03-31"), 30), (d("2026-03-01"), d("2026-03-31")));
    }
}
