//! Event reconciliation: raw scans to same-day sessions

use muster_api::{RawSession, Session};
use muster_config::DEFAULT_FREQUENCY_FILTER_SECS;
use muster_util::Calendar;
use tracing::debug;

/// Turns noisy scan timestamps into attendance sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    frequency_filter_secs: u64,
    calendar: Calendar,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_FILTER_SECS, Calendar::System)
    }
}

impl Reconciler {
    pub fn new(frequency_filter_secs: u64, calendar: Calendar) -> Self {
        Self {
            frequency_filter_secs,
            calendar,
        }
    }

    pub fn frequency_filter_secs(&self) -> u64 {
        self.frequency_filter_secs
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Sorted scans with repeats closer than the frequency threshold removed.
    ///
    /// Garbled timestamps (negative, or outside what the calendar can
    /// represent) are dropped first. The first scan is always kept; each
    /// later scan is kept only if it is at least the threshold after the
    /// last kept one.
    pub fn filter_frequent(&self, scans: &[i64]) -> Vec<i64> {
        let mut sorted: Vec<i64> = scans
            .iter()
            .copied()
            .filter(|&ts| {
                let ok = ts >= 0 && self.calendar.local(ts).is_some();
                if !ok {
                    debug!(timestamp = ts, "Dropping garbled scan");
                }
                ok
            })
            .collect();
        sorted.sort_unstable();

        let mut kept: Vec<i64> = Vec::with_capacity(sorted.len());
        for ts in sorted {
            match kept.last() {
                Some(&last) if ts.abs_diff(last) < self.frequency_filter_secs => {
                    debug!(timestamp = ts, previous = last, "Suppressing repeated scan");
                }
                _ => kept.push(ts),
            }
        }
        kept
    }

    /// Pair filtered scans into same-day sessions, ascending by start.
    ///
    /// Consecutive scans on the same local day become a session; a scan
    /// whose successor falls on another day is dropped on its own, as is a
    /// trailing scan with no successor.
    pub fn reconcile(&self, scans: &[i64]) -> Vec<Session> {
        let events = self.filter_frequent(scans);
        let mut sessions = Vec::with_capacity(events.len() / 2);

        let mut i = 1;
        while i < events.len() {
            let (start, end) = (events[i - 1], events[i]);
            match Session::new(start, end, &self.calendar) {
                Some(session) => {
                    sessions.push(session);
                    i += 2;
                }
                None => {
                    debug!(timestamp = start, "Dropping unpaired scan");
                    i += 1;
                }
            }
        }

        // Only reachable when the last scan was not consumed by a pair
        if i == events.len()
            && let Some(last) = events.last()
        {
            debug!(timestamp = *last, "Dropping trailing unpaired scan");
        }

        sessions
    }

    /// Accept sessions a collaborator already paired.
    ///
    /// Pairs that are inverted, cross a local day boundary or cannot be
    /// represented are dropped. The result is sorted by start.
    pub fn accept_sessions(&self, raw: &[RawSession]) -> Vec<Session> {
        let mut sessions: Vec<Session> = raw
            .iter()
            .filter_map(|pair| {
                let session = Session::new(pair.start, pair.end, &self.calendar);
                if session.is_none() {
                    debug!(start = pair.start, end = pair.end, "Dropping invalid pre-paired session");
                }
                session
            })
            .collect();
        sessions.sort_by_key(|s| (s.start(), s.end()));
        sessions
    }
}
