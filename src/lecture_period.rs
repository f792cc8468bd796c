use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Semester {
    Winter,
    Summer,
}

/// Lecture period bounds for the given year's semester.
///
/// Winter lectures start one week before the last Monday of October and run
/// 16 weeks; summer lectures start two weeks before the last Monday of April
/// and run 14 weeks.
fn semester_bounds(year: i32, semester: Semester) -> (NaiveDate, NaiveDate) {
    let (last_day, weeks_back, duration_weeks) = match semester {
        Semester::Winter => (NaiveDate::from_ymd_opt(year, 10, 31), 1, 16),
        Semester::Summer => (NaiveDate::from_ymd_opt(year, 4, 30), 2, 14),
    };
    // the 31st/30th always exists
    let last_day = last_day.unwrap();

    let last_monday = last_day - Duration::days(last_day.weekday().num_days_from_monday() as i64);
    let start = last_monday - Duration::weeks(weeks_back);
    let end = start + Duration::weeks(duration_weeks);

    (start, end)
}

/// Whether a date falls outside the running lecture period. The lecture-free
/// service-day tables apply on such days.
pub fn is_lecture_free(date: NaiveDate) -> bool {
    let (start, end) = match date.month() {
        4..=9 => semester_bounds(date.year(), Semester::Summer),
        1..=3 => semester_bounds(date.year() - 1, Semester::Winter),
        _ => semester_bounds(date.year(), Semester::Winter),
    };

    !(start <= date && date <= end)
}

/// Fixed Bavarian public holidays on which all canteens stay closed.
fn is_public_holiday(date: NaiveDate) -> bool {
    matches!(
        (date.month(), date.day()),
        (1, 1) | (1, 6) | (5, 1) | (10, 3) | (11, 1) | (12, 24) | (12, 25) | (12, 26) | (12, 31)
    )
}

/// Closure marker for the MenuDay row: weekends and public holidays.
pub fn is_closed_on(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun) || is_public_holiday(date)
}
