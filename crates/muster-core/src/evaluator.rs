//! Policy evaluation
//!
//! One evaluator serves every policy. The [`RegularSpec`] of a definition
//! selects how regular attendance is counted, and violations are composed
//! the same way for built-in and runtime-registered policies.

use chrono::{Datelike, NaiveDate};
use muster_api::{EvaluationResult, MemberInfo, Session};
use muster_config::{PolicyDefinition, RegularSpec};
use muster_util::{DayWindow, format_hours_minutes};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Allowance added once to every aggregate before it is compared
pub const GRACE_SECONDS: u64 = 600;

const SECONDS_PER_HOUR: u64 = 3600;

/// Evaluates one member's sessions under one policy.
///
/// Metrics are computed on first access and cached for the lifetime of the
/// evaluator.
#[derive(Debug)]
pub struct Evaluator<'a> {
    policy: Arc<PolicyDefinition>,
    member: &'a MemberInfo,
    sessions: &'a [Session],
    total_secs: OnceCell<u64>,
    flex: OnceCell<u32>,
    regular: OnceCell<u32>,
    violations: OnceCell<u32>,
}

impl<'a> Evaluator<'a> {
    pub fn new(policy: Arc<PolicyDefinition>, member: &'a MemberInfo, sessions: &'a [Session]) -> Self {
        Self {
            policy,
            member,
            sessions,
            total_secs: OnceCell::new(),
            flex: OnceCell::new(),
            regular: OnceCell::new(),
            violations: OnceCell::new(),
        }
    }

    pub fn policy(&self) -> &PolicyDefinition {
        &self.policy
    }

    pub fn member(&self) -> &MemberInfo {
        self.member
    }

    /// Total attended seconds across all sessions
    pub fn total_secs(&self) -> u64 {
        *self
            .total_secs
            .get_or_init(|| self.sessions.iter().map(Session::duration_secs).sum())
    }

    /// Total attended time as `HH:MM`
    pub fn seconds(&self) -> String {
        format_hours_minutes(self.total_secs())
    }

    /// Whole flexible hours credited, grace included; 0 for training policies
    pub fn flex_count(&self) -> u32 {
        *self.flex.get_or_init(|| match self.policy.regular {
            RegularSpec::Training(_) => 0,
            _ => {
                let hours = (self.total_secs() + GRACE_SECONDS) / SECONDS_PER_HOUR;
                u32::try_from(hours).unwrap_or(u32::MAX)
            }
        })
    }

    /// Scheduled-window attendance under the policy's regular spec
    pub fn regular_count(&self) -> u32 {
        *self.regular.get_or_init(|| match &self.policy.regular {
            RegularSpec::Weekday { day, window } => {
                let overlap: u64 = self
                    .sessions
                    .iter()
                    .filter(|s| s.date().weekday() == *day)
                    .map(|s| overlap_secs(window, s))
                    .sum();
                u32::from(window_met(window, overlap))
            }
            RegularSpec::Daily => {
                let days: BTreeSet<NaiveDate> = self.sessions.iter().map(Session::date).collect();
                count(days.len())
            }
            RegularSpec::None => 0,
            RegularSpec::Training(training) => {
                let required = training.required_days();
                let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
                for session in self.sessions.iter().filter(|s| required.contains(&s.date())) {
                    *per_day.entry(session.date()).or_default() +=
                        overlap_secs(&training.window, session);
                }
                count(
                    per_day
                        .values()
                        .filter(|&&overlap| window_met(&training.window, overlap))
                        .count(),
                )
            }
        })
    }

    /// Rule violations: a missed flex threshold plus a missed regular check
    pub fn violation_count(&self) -> u32 {
        *self.violations.get_or_init(|| {
            let mut violations = 0;

            if let Some(threshold) = &self.policy.flex_threshold
                && self.flex_count() < threshold.for_category(&self.member.category)
            {
                violations += 1;
            }

            match &self.policy.regular {
                RegularSpec::Weekday { .. } if self.regular_count() == 0 => violations += 1,
                RegularSpec::Training(training)
                    if (self.regular_count() as usize) < training.required_days().len() =>
                {
                    violations += 1
                }
                _ => {}
            }

            violations
        })
    }

    /// All four metrics
    pub fn result(&self) -> EvaluationResult {
        EvaluationResult {
            seconds: self.seconds(),
            flex_count: self.flex_count(),
            regular_count: self.regular_count(),
            violation_count: self.violation_count(),
        }
    }
}

fn overlap_secs(window: &DayWindow, session: &Session) -> u64 {
    let (from, to) = session.seconds_of_day();
    u64::from(window.overlap_secs(from, to))
}

fn window_met(window: &DayWindow, overlap: u64) -> bool {
    overlap + GRACE_SECONDS >= u64::from(window.duration_secs())
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
