//! Shared types for the muster core

use chrono::{NaiveDate, Timelike};
use muster_util::{Calendar, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A member of the roster being evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Roster identifier, kept as given; normalized when joined with records
    pub id: String,

    /// Category label used for per-category thresholds
    #[serde(default)]
    pub category: String,

    /// Fields the core carries through but never interprets
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, String>,
}

impl MemberInfo {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Identifier with text normalization applied
    pub fn member_id(&self) -> MemberId {
        MemberId::new(&self.id)
    }
}

/// A start/end pair as supplied by a collaborator that already paired scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSession {
    pub start: i64,
    pub end: i64,
}

/// One attendance session: a start and an end scan on the same local day.
///
/// Immutable once created. The local date and seconds-of-day of both ends
/// are resolved at construction, so evaluation never needs the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    start: i64,
    end: i64,
    date: NaiveDate,
    start_of_day: u32,
    end_of_day: u32,
}

impl Session {
    /// Create a session; `None` if `end < start`, if either end cannot be
    /// represented, or if the two ends fall on different local days
    pub fn new(start: i64, end: i64, calendar: &Calendar) -> Option<Self> {
        if end < start {
            return None;
        }

        let start_local = calendar.local(start)?;
        let end_local = calendar.local(end)?;
        if start_local.date() != end_local.date() {
            return None;
        }

        Some(Self {
            start,
            end,
            date: start_local.date(),
            start_of_day: start_local.time().num_seconds_from_midnight(),
            end_of_day: end_local.time().num_seconds_from_midnight(),
        })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Local calendar day of the session
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Elapsed seconds between the two scans
    pub fn duration_secs(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    /// Local seconds-of-day of the start and end scans
    pub fn seconds_of_day(&self) -> (u32, u32) {
        (self.start_of_day, self.end_of_day)
    }
}

impl From<&Session> for RawSession {
    fn from(session: &Session) -> Self {
        Self {
            start: session.start,
            end: session.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};
    use muster_util::TimeOfDay;

    fn cal() -> Calendar {
        Calendar::fixed(8 * 3600).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        cal()
            .timestamp_at(date, TimeOfDay::from_hms(h, min, 0).unwrap())
            .unwrap()
    }

    #[test]
    fn session_resolves_local_fields() {
        let session = Session::new(at(2024, 10, 5, 12, 0), at(2024, 10, 5, 17, 30), &cal()).unwrap();

        assert_eq!(session.date(), NaiveDate::from_ymd_opt(2024, 10, 5).unwrap());
        assert_eq!(session.date().weekday(), Weekday::Sat);
        assert_eq!(session.duration_secs(), 5 * 3600 + 1800);
        assert_eq!(session.seconds_of_day(), (12 * 3600, 17 * 3600 + 1800));
    }

    #[test]
    fn session_rejects_inverted_pair() {
        assert!(Session::new(at(2024, 10, 5, 17, 0), at(2024, 10, 5, 12, 0), &cal()).is_none());
    }

    #[test]
    fn session_rejects_cross_day_pair() {
        assert!(Session::new(at(2024, 10, 5, 23, 0), at(2024, 10, 6, 1, 0), &cal()).is_none());
    }

    #[test]
    fn zero_length_session_is_valid() {
        let t = at(2024, 10, 5, 9, 0);
        let session = Session::new(t, t, &cal()).unwrap();
        assert_eq!(session.duration_secs(), 0);
    }

    #[test]
    fn member_info_keeps_extra_fields() {
        let json = r#"{ "id": " a01 ", "category": "competitor", "name": "Lin", "gender": "F" }"#;
        let member: MemberInfo = serde_json::from_str(json).unwrap();

        assert_eq!(member.member_id().as_str(), "A01");
        assert_eq!(member.category, "competitor");
        assert_eq!(member.extra.get("name").map(String::as_str), Some("Lin"));
        assert_eq!(member.extra.len(), 2);
    }
}
