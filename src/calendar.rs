//! Calendar helpers for month and year arithmetic.

use time::{Date, Duration, Month};

use crate::Error;

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day in the range.
    pub start: Date,
    /// The last day in the range.
    pub end: Date,
}

impl DateRange {
    /// Whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The first and last day of the month containing `date`.
pub fn month_bounds(date: Date) -> DateRange {
    let (year, month) = (date.year(), date.month());
    let start = Date::from_calendar_date(year, month, 1).expect("invalid month start date");
    let end = Date::from_calendar_date(year, month, last_day_of_month(year, month))
        .expect("invalid month end date");

    DateRange { start, end }
}

/// The first and last day of the year containing `date`.
pub fn year_bounds(date: Date) -> DateRange {
    let year = date.year();

    DateRange {
        start: Date::from_calendar_date(year, Month::January, 1).expect("invalid year start date"),
        end: Date::from_calendar_date(year, Month::December, 31).expect("invalid year end date"),
    }
}

/// Move `date` by `months` calendar months, clamping the day to the end of the target month.
///
/// For example, one month after January 31 is the last day of February.
///
/// # Errors
/// Returns [Error::Validation] if the result is outside the supported range of years.
pub fn add_months(date: Date, months: i32) -> Result<Date, Error> {
    let month_index = date.year() * 12 + (date.month() as i32 - 1) + months;
    let year = month_index.div_euclid(12);
    let month = Month::January.nth_next(month_index.rem_euclid(12) as u8);
    let day = date.day().min(last_day_of_month(year, month));

    Ok(Date::from_calendar_date(year, month, day)?)
}

/// Move `date` by `weeks` weeks.
///
/// # Errors
/// Returns [Error::Validation] if the result is outside the supported range of dates.
pub fn add_weeks(date: Date, weeks: i64) -> Result<Date, Error> {
    date.checked_add(Duration::weeks(weeks))
        .ok_or_else(|| Error::Validation(format!("{date} plus {weeks} weeks is out of range")))
}

/// A short label for the month containing `date`, e.g. "Oct 2026".
pub fn month_label(date: Date) -> String {
    format!("{} {}", month_abbrev(date.month()), date.year())
}

fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
