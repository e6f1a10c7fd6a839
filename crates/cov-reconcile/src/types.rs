use std::collections::BTreeMap;

use cov_delegation::DelegationRouting;
use cov_schemas::{AssertionStatus, CoverageAssertion, Layer};
use serde::{Deserialize, Serialize};

/// Lower bound applied to every non-empty reconciliation.
pub const CONFIDENCE_FLOOR: f64 = 0.10;
/// Upper bound applied to every non-empty reconciliation.
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Final coverage status for one (payer, test) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciledStatus {
    Supports,
    Restricts,
    Denies,
    Unclear,
    /// Terminal. Downstream consumers must route this to a human.
    ConflictReviewRequired,
    /// No assertions at all.
    Unknown,
}

impl ReconciledStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciledStatus::Supports => "supports",
            ReconciledStatus::Restricts => "restricts",
            ReconciledStatus::Denies => "denies",
            ReconciledStatus::Unclear => "unclear",
            ReconciledStatus::ConflictReviewRequired => "conflict_review_required",
            ReconciledStatus::Unknown => "unknown",
        }
    }

    pub(crate) fn from_assertion(status: &AssertionStatus) -> Self {
        match status {
            AssertionStatus::Supports => ReconciledStatus::Supports,
            AssertionStatus::Restricts => ReconciledStatus::Restricts,
            AssertionStatus::Denies => ReconciledStatus::Denies,
            AssertionStatus::Unclear | AssertionStatus::Unknown(_) => ReconciledStatus::Unclear,
        }
    }
}

impl std::fmt::Display for ReconciledStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflict severity. Ordered so that `High` sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    High,
    Medium,
    Low,
}

impl ConflictSeverity {
    /// Confidence penalty per conflict of this severity.
    pub fn penalty(self) -> f64 {
        match self {
            ConflictSeverity::High => 0.30,
            ConflictSeverity::Medium => 0.15,
            ConflictSeverity::Low => 0.05,
        }
    }
}

/// One side of a conflict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSide {
    pub assertion_id: String,
    pub layer: Layer,
    pub status: AssertionStatus,
}

impl From<&CoverageAssertion> for ConflictSide {
    fn from(a: &CoverageAssertion) -> Self {
        Self {
            assertion_id: a.assertion_id.clone(),
            layer: a.layer.clone(),
            status: a.status.clone(),
        }
    }
}

/// Disagreement between a higher-ranked and a lower-ranked assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub severity: ConflictSeverity,
    pub higher: ConflictSide,
    pub lower: ConflictSide,
    pub description: String,
}

/// Reconciled decision for one (payer, test). Always recomputed from current
/// assertions; a cached copy is never authoritative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub payer_id: String,
    pub test_id: String,
    pub status: ReconciledStatus,
    pub confidence: f64,
    /// Top-ranked assertion (weight, then confidence).
    pub authoritative: Option<CoverageAssertion>,
    /// Every other assertion, in rank order. Demoted assertions stay here.
    pub supporting: Vec<CoverageAssertion>,
    pub conflicts: Vec<Conflict>,
    pub has_conflict: bool,
    pub delegation: DelegationRouting,
    /// Layer weights in effect for this computation.
    pub weights: BTreeMap<String, f64>,
    pub message: String,
}

impl ReconciliationResult {
    pub fn needs_review(&self) -> bool {
        self.status == ReconciledStatus::ConflictReviewRequired
    }

    /// Highest severity present, if any.
    pub fn worst_conflict(&self) -> Option<ConflictSeverity> {
        self.conflicts.iter().map(|c| c.severity).min()
    }
}
