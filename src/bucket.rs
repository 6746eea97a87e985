//! Calendar bucketing of stream timestamps.
//!
//! Fields are read straight off the stored `OffsetDateTime`; no offset is
//! applied, so an hour of `7` means 07:xx on whatever clock the export used.

use std::fmt;
use std::ops::{Range, RangeInclusive};
use time::OffsetDateTime;

pub const MONTHS: RangeInclusive<u8> = 1..=12;
pub const HOURS: Range<u8> = 0..24;

pub fn year_of(ts: OffsetDateTime) -> i32 {
    ts.year()
}

/// Calendar year and month (1-12).
pub fn year_month_of(ts: OffsetDateTime) -> (i32, u8) {
    (ts.year(), u8::from(ts.month()))
}

pub fn hour_of(ts: OffsetDateTime) -> u8 {
    ts.hour()
}

/// Time filter applied to the log before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeScope {
    AllTime,
    PerYear(i32),
    PerYearMonth(i32, u8),
    PerHourOfDay(u8),
    PerHourOfDayPerYear { year: i32, hour: u8 },
}

impl TimeScope {
    pub fn contains(self, ts: OffsetDateTime) -> bool {
        match self {
            Self::AllTime => true,
            Self::PerYear(year) => year_of(ts) == year,
            Self::PerYearMonth(year, month) => year_month_of(ts) == (year, month),
            Self::PerHourOfDay(hour) => hour_of(ts) == hour,
            Self::PerHourOfDayPerYear { year, hour } => year_of(ts) == year && hour_of(ts) == hour,
        }
    }
}

impl fmt::Display for TimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTime => f.write_str("all"),
            Self::PerYear(year) => write!(f, "{year:04}"),
            Self::PerYearMonth(year, month) => write!(f, "{year:04}-{month:02}"),
            Self::PerHourOfDay(hour) => write!(f, "hour-{hour:02}"),
            Self::PerHourOfDayPerYear { year, hour } => write!(f, "{year:04}/hour-{hour:02}"),
        }
    }
}
