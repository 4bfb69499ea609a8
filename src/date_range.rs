//! Date ranges for pre-filling the bulk-entry table: every day between two
//! dates, whole weeks from a start date, or every day of a calendar month.

use chrono::{Datelike, Days, NaiveDate};

/// Supported years for month templates.
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;
/// Upper bound on week templates.
pub const MAX_WEEKS: u32 = 52;

/// Every day from `start` to `end`, both inclusive. Empty when `end < start`.
pub fn by_day(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// `weeks` consecutive seven-day blocks starting at `start`.
pub fn by_week(start: NaiveDate, weeks: u32) -> Result<Vec<NaiveDate>, DateRangeError> {
    if weeks == 0 || weeks > MAX_WEEKS {
        return Err(DateRangeError::Weeks(weeks));
    }
    let days = u64::from(weeks) * 7;
    let end = start
        .checked_add_days(Days::new(days - 1))
        .ok_or(DateRangeError::Overflow)?;
    Ok(by_day(start, end))
}

/// Every day of `month` in `year`.
pub fn by_month(year: i32, month: u32) -> Result<Vec<NaiveDate>, DateRangeError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(DateRangeError::Year(year));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(DateRangeError::Month(month))?;
    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    Weeks(u32),
    Year(i32),
    Month(u32),
    Overflow,
}

impl std::fmt::Display for DateRangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateRangeError::Weeks(w) => write!(f, "weeks must be 1..={MAX_WEEKS}, got {w}"),
            DateRangeError::Year(y) => {
                write!(f, "year must be {MIN_YEAR}..={MAX_YEAR}, got {y}")
            }
            DateRangeError::Month(m) => write!(f, "month must be 1..=12, got {m}"),
            DateRangeError::Overflow => f.write_str("date range runs past the supported calendar"),
        }
    }
}

impl std::error::Error for DateRangeError {}
