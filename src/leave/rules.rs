use chrono::{Datelike, NaiveDate};

/// Inclusive day count; 0 when `end` precedes `start`.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(0)
}

/// Inclusive, date-only ranges.
pub fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

/// Days of `[start, end]` falling inside calendar `year`.
pub fn days_within_year(start: NaiveDate, end: NaiveDate, year: i32) -> i64 {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return 0;
    };

    if !ranges_overlap(start, end, first, last) {
        return 0;
    }
    inclusive_days(start.max(first), end.min(last))
}

/// Every calendar year `[start, end]` touches, ascending.
pub fn years_touched(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = i32> {
    start.year()..=end.year()
}
