//! Roster-wide evaluation

use chrono::NaiveDate;
use muster_api::{
    BatchReport, EvaluationResult, EventSource, MemberFailure, MemberInfo, MemberRecords,
    MemberReport, Session,
};
use muster_config::{PolicyDefinition, Settings};
use muster_util::{MemberId, MemberIdStyle};
use std::collections::{BTreeSet, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::{CoreError, CoreResult, Evaluator, MemberError, PolicyRegistry, Reconciler};

/// Evaluates a whole roster under one policy
#[derive(Debug)]
pub struct BatchEvaluator<'r> {
    registry: &'r PolicyRegistry,
    reconciler: Reconciler,
    id_style: MemberIdStyle,
    only_days: Option<BTreeSet<NaiveDate>>,
}

/// A roster member ready for evaluation
struct Job<'a> {
    slot: usize,
    member_id: MemberId,
    member: &'a MemberInfo,
    sessions: Vec<Session>,
}

impl<'r> BatchEvaluator<'r> {
    pub fn new(registry: &'r PolicyRegistry, reconciler: Reconciler) -> Self {
        Self {
            registry,
            reconciler,
            id_style: MemberIdStyle::default(),
            only_days: None,
        }
    }

    /// Evaluator configured from a policy file's settings
    pub fn from_settings(registry: &'r PolicyRegistry, settings: &Settings) -> Self {
        Self::new(
            registry,
            Reconciler::new(settings.frequency_filter_secs, settings.calendar),
        )
        .with_id_style(settings.member_id_style)
    }

    pub fn with_id_style(mut self, style: MemberIdStyle) -> Self {
        self.id_style = style;
        self
    }

    /// Only count sessions on these local dates
    pub fn with_only_days(mut self, days: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.only_days = Some(days.into_iter().collect());
        self
    }

    /// Evaluate every roster member under `policy`.
    ///
    /// Only an unknown policy or a panicked worker fails the whole run;
    /// members that cannot be evaluated are reported in
    /// [`BatchReport::failures`]. Both lists keep roster order.
    pub fn run(
        &self,
        policy: &str,
        roster: &[MemberInfo],
        source: &EventSource,
    ) -> CoreResult<BatchReport> {
        let definition = self.registry.get(policy)?;

        let mut failures: Vec<(usize, MemberFailure)> = Vec::new();
        let mut jobs = Vec::with_capacity(roster.len());
        let mut seen = HashSet::new();

        for (slot, member) in roster.iter().enumerate() {
            let member_id = match self.member_id(member, &mut seen) {
                Ok(id) => id,
                Err(e) => {
                    warn!(member_id = %member.id, error = %e, "Skipping member");
                    failures.push((
                        slot,
                        MemberFailure {
                            member_id: member.id.clone(),
                            error: e.to_string(),
                        },
                    ));
                    continue;
                }
            };

            let sessions = self.sessions_for(&member_id, source);
            jobs.push(Job {
                slot,
                member_id,
                member,
                sessions,
            });
        }

        let mut evaluated = evaluate_parallel(&definition, jobs)?;
        evaluated.sort_by_key(|(slot, _)| *slot);
        failures.sort_by_key(|(slot, _)| *slot);

        let report = BatchReport {
            policy: definition.name.clone(),
            results: evaluated.into_iter().map(|(_, report)| report).collect(),
            failures: failures.into_iter().map(|(_, failure)| failure).collect(),
        };

        info!(
            policy = %report.policy,
            evaluated = report.results.len(),
            failed = report.failures.len(),
            violations = report.total_violations(),
            "Batch evaluated"
        );

        Ok(report)
    }

    fn member_id(
        &self,
        member: &MemberInfo,
        seen: &mut HashSet<MemberId>,
    ) -> Result<MemberId, MemberError> {
        let member_id = self.id_style.normalize(&member.id)?;
        if !seen.insert(member_id.clone()) {
            return Err(MemberError::DuplicateMember(member_id.to_string()));
        }
        Ok(member_id)
    }

    fn sessions_for(&self, member_id: &MemberId, source: &EventSource) -> Vec<Session> {
        let mut sessions = match source.get(member_id) {
            Some(MemberRecords::Raw(scans)) => self.reconciler.reconcile(scans),
            Some(MemberRecords::Sessions(pairs)) => self.reconciler.accept_sessions(pairs),
            None => {
                debug!(member_id = %member_id, "No records for member");
                Vec::new()
            }
        };

        if let Some(days) = &self.only_days {
            sessions.retain(|s| days.contains(&s.date()));
        }
        sessions
    }
}

/// Evaluate jobs on scoped worker threads, at most one per CPU
fn evaluate_parallel(
    definition: &Arc<PolicyDefinition>,
    jobs: Vec<Job<'_>>,
) -> CoreResult<Vec<(usize, MemberReport)>> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(jobs.len());
    let chunk_size = jobs.len().div_ceil(workers);

    thread::scope(|s| {
        let handles: Vec<_> = jobs
            .chunks(chunk_size)
            .map(|chunk| {
                let definition = Arc::clone(definition);
                s.spawn(move || {
                    chunk
                        .iter()
                        .map(|job| {
                            let result = evaluate(&definition, job);
                            (
                                job.slot,
                                MemberReport {
                                    member_id: job.member_id.clone(),
                                    result,
                                },
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut out = Vec::with_capacity(jobs.len());
        for handle in handles {
            let joined = handle.join().map_err(|_| CoreError::WorkerPanicked)?;
            out.extend(joined);
        }
        Ok(out)
    })
}

fn evaluate(definition: &Arc<PolicyDefinition>, job: &Job<'_>) -> EvaluationResult {
    Evaluator::new(Arc::clone(definition), job.member, &job.sessions).result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_api::RawSession;
    use muster_util::{Calendar, TimeOfDay};

    fn cal() -> Calendar {
        Calendar::fixed(8 * 3600).unwrap()
    }

    fn at(m: u32, d: u32, h: u32, min: u32) -> i64 {
        let date = NaiveDate::from_ymd_opt(2024, m, d).unwrap();
        cal()
            .timestamp_at(date, TimeOfDay::from_hms(h, min, 0).unwrap())
            .unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(60, cal())
    }

    #[test]
    fn unknown_policy_fails_the_run() {
        let registry = PolicyRegistry::with_builtins().unwrap();
        let batch = BatchEvaluator::new(&registry, reconciler());
        let result = batch.run("missing", &[], &EventSource::new());
        assert!(matches!(result, Err(CoreError::PolicyNotFound(_))));
    }

    #[test]
    fn failures_do_not_abort_the_batch() {
        let registry = PolicyRegistry::with_builtins().unwrap();
        let roster = vec![
            MemberInfo::new("a01", "competitor"),
            MemberInfo::new("   ", ""),
            MemberInfo::new("b02", "full-member"),
            MemberInfo::new("A01", ""),
            MemberInfo::new("c03", ""),
        ];

        let mut source = EventSource::new();
        source.insert(
            MemberId::new("A01"),
            MemberRecords::Raw(vec![at(10, 5, 12, 0), at(10, 5, 12, 0) + 20, at(10, 5, 17, 0)]),
        );
        source.insert(
            MemberId::new("B02"),
            MemberRecords::Sessions(vec![RawSession {
                start: at(10, 7, 9, 0),
                end: at(10, 7, 11, 0),
            }]),
        );

        let report = BatchEvaluator::new(&registry, reconciler())
            .run("term-regular", &roster, &source)
            .unwrap();

        let ids: Vec<&str> = report.results.iter().map(|r| r.member_id.as_str()).collect();
        assert_eq!(ids, vec!["A01", "B02", "C03"]);

        let a01 = report.result_for(&MemberId::new("A01")).unwrap();
        assert_eq!(a01.seconds, "05:00");
        assert_eq!(a01.regular_count, 1);
        assert_eq!(a01.violation_count, 1);

        let b02 = report.result_for(&MemberId::new("B02")).unwrap();
        assert_eq!(b02.flex_count, 2);
        assert_eq!(b02.violation_count, 2);

        let c03 = report.result_for(&MemberId::new("C03")).unwrap();
        assert_eq!(c03.seconds, "00:00");

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].member_id, "   ");
        assert_eq!(report.failures[1].member_id, "A01");
        assert!(report.failures[1].error.contains("more than once"));
    }

    #[test]
    fn numeric_ids_are_normalized() {
        let registry = PolicyRegistry::with_builtins().unwrap();
        let roster = vec![MemberInfo::new("1024.0", ""), MemberInfo::new("x", "")];
        let source = EventSource::from_raw_events(vec![
            muster_api::RawEvent::new("1024", at(10, 7, 9, 0)),
            muster_api::RawEvent::new("1024", at(10, 7, 12, 0)),
        ]);

        let report = BatchEvaluator::new(&registry, reconciler())
            .with_id_style(MemberIdStyle::Numeric)
            .run("exam-weeks-2024", &roster, &source)
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].member_id.as_str(), "1024");
        assert_eq!(report.results[0].result.seconds, "03:00");
        assert_eq!(report.failures[0].member_id, "x");
    }

    #[test]
    fn only_days_filters_sessions() {
        let registry = PolicyRegistry::with_builtins().unwrap();
        let roster = vec![MemberInfo::new("a01", "")];
        let source = EventSource::from_raw_events(
            [
                at(10, 7, 9, 0),
                at(10, 7, 12, 0),
                at(10, 8, 9, 0),
                at(10, 8, 10, 0),
            ]
            .into_iter()
            .map(|ts| muster_api::RawEvent::new("A01", ts)),
        );

        let report = BatchEvaluator::new(&registry, reconciler())
            .with_only_days([NaiveDate::from_ymd_opt(2024, 10, 8).unwrap()])
            .run("exam-weeks-2024", &roster, &source)
            .unwrap();

        assert_eq!(report.results[0].result.seconds, "01:00");
    }

    #[test]
    fn large_roster_keeps_order() {
        let registry = PolicyRegistry::with_builtins().unwrap();
        let roster: Vec<MemberInfo> = (0..200)
            .map(|i| MemberInfo::new(format!("m{:03}", i), ""))
            .collect();
        let mut source = EventSource::new();
        for i in 0..200u32 {
            let start = at(10, 7, 8, 0);
            source.insert(
                MemberId::new(format!("M{:03}", i)),
                MemberRecords::Raw(vec![start, start + i64::from(i) * 60 + 60]),
            );
        }

        let report = BatchEvaluator::new(&registry, reconciler())
            .run("exam-weeks-2024", &roster, &source)
            .unwrap();

        assert_eq!(report.results.len(), 200);
        for (i, row) in report.results.iter().enumerate() {
            assert_eq!(row.member_id.to_string(), format!("M{:03}", i));
            assert_eq!(row.result.seconds, format!("{:02}:{:02}", (i + 1) / 60, (i + 1) % 60));
        }
    }
}
