//! Time utilities for muster
//!
//! All attendance rules are expressed in local wall-clock terms: a session
//! belongs to a local calendar day, and required windows are seconds-of-day.
//! [`Calendar`] is the single place that maps unix timestamps onto that local
//! view, either through the system zone or through a fixed UTC offset.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, Timelike, Utc, Weekday};
use std::fmt;

/// Seconds in one calendar day
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Maps unix timestamps onto local calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Calendar {
    /// The zone of the machine running the evaluation
    #[default]
    System,
    /// A fixed offset from UTC
    Fixed(FixedOffset),
}

impl Calendar {
    /// Calendar at a fixed offset east of UTC, in seconds
    pub fn fixed(offset_seconds: i32) -> Option<Self> {
        FixedOffset::east_opt(offset_seconds).map(Calendar::Fixed)
    }

    /// UTC calendar
    pub fn utc() -> Self {
        Calendar::Fixed(Utc.fix())
    }

    /// Local date and time of a timestamp; `None` if it cannot be represented
    pub fn local(&self, timestamp: i64) -> Option<NaiveDateTime> {
        let utc = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
        Some(match self {
            Calendar::System => utc.with_timezone(&Local).naive_local(),
            Calendar::Fixed(offset) => utc.with_timezone(offset).naive_local(),
        })
    }

    /// Local calendar day of a timestamp
    pub fn date_of(&self, timestamp: i64) -> Option<NaiveDate> {
        self.local(timestamp).map(|dt| dt.date())
    }

    /// Seconds elapsed since local midnight
    pub fn seconds_of_day(&self, timestamp: i64) -> Option<u32> {
        self.local(timestamp)
            .map(|dt| dt.time().num_seconds_from_midnight())
    }

    /// Whether two timestamps fall on the same local calendar day
    pub fn same_day(&self, a: i64, b: i64) -> bool {
        match (self.date_of(a), self.date_of(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Unix timestamp of a local date and time of day.
    ///
    /// For the system zone an ambiguous local time resolves to the earlier
    /// instant; a local time skipped by a DST jump yields `None`.
    pub fn timestamp_at(&self, date: NaiveDate, time: TimeOfDay) -> Option<i64> {
        let naive = date.and_time(time.to_naive_time()?);
        match self {
            Calendar::System => naive
                .and_local_timezone(Local)
                .earliest()
                .map(|dt| dt.timestamp()),
            Calendar::Fixed(offset) => naive
                .and_local_timezone(*offset)
                .single()
                .map(|dt| dt.timestamp()),
        }
    }
}

/// Wall-clock time of day, in seconds since midnight.
///
/// `24:00` (86400) is allowed so a window can run to the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(SECONDS_PER_DAY);

    pub fn from_seconds(seconds: u32) -> Option<Self> {
        if seconds <= SECONDS_PER_DAY {
            Some(Self(seconds))
        } else {
            None
        }
    }

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if hour > 24 || minute >= 60 || second >= 60 {
            return None;
        }
        Self::from_seconds(hour * 3600 + minute * 60 + second)
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        self.0
    }

    /// `None` for `24:00`, which has no `NaiveTime`
    pub fn to_naive_time(self) -> Option<chrono::NaiveTime> {
        chrono::NaiveTime::from_num_seconds_from_midnight_opt(self.0, 0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = (self.0 / 3600, self.0 % 3600 / 60, self.0 % 60);
        if s == 0 {
            write!(f, "{:02}:{:02}", h, m)
        } else {
            write!(f, "{:02}:{:02}:{:02}", h, m, s)
        }
    }
}

/// A required attendance window `[start, end)` within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl DayWindow {
    /// `None` unless `start < end`; windows never cross midnight
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Length of the window in seconds
    pub fn duration_secs(&self) -> u32 {
        self.end.0 - self.start.0
    }

    /// Seconds of `[from, to)` (seconds-of-day) that fall inside the window,
    /// never negative
    pub fn overlap_secs(&self, from: u32, to: u32) -> u32 {
        let lo = from.max(self.start.0);
        let hi = to.min(self.end.0);
        hi.saturating_sub(lo)
    }
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Weekday from its index, Monday = 0 through Sunday = 6
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// Format a total number of seconds as `HH:MM`.
///
/// Hours are not wrapped at 24 and seconds are truncated.
pub fn format_hours_minutes(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    format!("{:02}:{:02}", hours, minutes)
}
