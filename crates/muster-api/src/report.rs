//! Evaluation results handed to reporting

use muster_util::{MemberId, PolicyName};
use serde::{Deserialize, Serialize};

/// Compliance metrics of one member under one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Total attended time, `HH:MM`
    pub seconds: String,
    /// Credited flexible hours
    pub flex_count: u32,
    /// Scheduled-window attendance count
    pub regular_count: u32,
    /// Number of rule violations
    pub violation_count: u32,
}

/// Result row for one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReport {
    pub member_id: MemberId,
    #[serde(flatten)]
    pub result: EvaluationResult,
}

/// A member that could not be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFailure {
    /// Roster id as given
    pub member_id: String,
    pub error: String,
}

/// Outcome of evaluating a whole roster under one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub policy: PolicyName,
    /// Successful members, in roster order
    pub results: Vec<MemberReport>,
    /// Failed members, in roster order
    pub failures: Vec<MemberFailure>,
}

impl BatchReport {
    /// Result of a member by normalized id
    pub fn result_for(&self, member_id: &MemberId) -> Option<&EvaluationResult> {
        self.results
            .iter()
            .find(|r| &r.member_id == member_id)
            .map(|r| &r.result)
    }

    /// Sum of violations across all evaluated members
    pub fn total_violations(&self) -> u32 {
        self.results.iter().map(|r| r.result.violation_count).sum()
    }
}
