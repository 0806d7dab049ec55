//! Wire formats for timestamps and the date-range filters used by event listings.

use time::{macros::format_description, Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::error::AppError;

const MINUTE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");
const DAY_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Inclusive bounds on an event date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: OffsetDateTime,
    pub to: OffsetDateTime,
}

impl DateRange {
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Parses `YYYY-MM-DD HH:MM`, interpreted as UTC.
pub fn parse_event_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    PrimitiveDateTime::parse(raw.trim(), MINUTE_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| AppError::validation("Invalid date format. Use YYYY-MM-DD HH:MM"))
}

pub fn format_minutes(at: OffsetDateTime) -> String {
    at.format(MINUTE_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn start_of(date: Date) -> OffsetDateTime {
    date.with_time(Time::MIDNIGHT).assume_utc()
}

fn end_of(date: Date) -> OffsetDateTime {
    date.with_hms(23, 59, 59)
        .map(PrimitiveDateTime::assume_utc)
        .unwrap_or_else(|_| start_of(date))
}

fn calendar_date(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Whole-day range from the public listing's `start_*`/`end_*` parts.
pub fn day_range(start: (i32, u8, u8), end: (i32, u8, u8)) -> Result<DateRange, AppError> {
    let invalid = || AppError::validation("Invalid date range");
    let from = calendar_date(start.0, start.1, start.2).ok_or_else(invalid)?;
    let to = calendar_date(end.0, end.1, end.2).ok_or_else(invalid)?;
    Ok(DateRange {
        from: start_of(from),
        to: end_of(to),
    })
}

/// Explicit `from`/`to` pair, both `YYYY-MM-DD`; `to` covers its whole day.
pub fn explicit_range(from: &str, to: &str) -> Result<DateRange, AppError> {
    let parse = |raw: &str| {
        Date::parse(raw.trim(), DAY_FORMAT)
            .map_err(|_| AppError::validation("Date format should be YYYY-MM-DD"))
    };
    Ok(DateRange {
        from: start_of(parse(from)?),
        to: end_of(parse(to)?),
    })
}

/// Range covering a calendar period. Missing parts widen the period: the lower
/// bound starts at the first month/day/hour, the upper bound ends at the last.
pub fn period_range(
    year: i32,
    month: Option<u8>,
    day: Option<u8>,
    hour: Option<u8>,
) -> Result<DateRange, AppError> {
    let invalid = || AppError::validation("Invalid date period");

    let first_month = Month::try_from(month.unwrap_or(1)).map_err(|_| invalid())?;
    let last_month = Month::try_from(month.unwrap_or(12)).map_err(|_| invalid())?;
    let last_day = day.unwrap_or_else(|| last_month.length(year));

    let from = Date::from_calendar_date(year, first_month, day.unwrap_or(1))
        .and_then(|d| d.with_hms(hour.unwrap_or(0), 0, 0))
        .map_err(|_| invalid())?;
    let to = Date::from_calendar_date(year, last_month, last_day)
        .and_then(|d| d.with_hms(hour.unwrap_or(23), 59, 59))
        .map_err(|_| invalid())?;

    Ok(DateRange {
        from: from.assume_utc(),
        to: to.assume_utc(),
    })
}
