use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gate::{check_publish_gate, PublishGate};
use crate::types::{ReconciledStatus, ReconciliationResult};

/// Coverage vocabulary used by the display layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontendStatus {
    Covered,
    Conditional,
    NotCovered,
    Unknown,
}

/// supports → covered, restricts → conditional, denies → not covered,
/// everything else (conflicts included) → unknown.
pub fn frontend_status(status: ReconciledStatus) -> FrontendStatus {
    match status {
        ReconciledStatus::Supports => FrontendStatus::Covered,
        ReconciledStatus::Restricts => FrontendStatus::Conditional,
        ReconciledStatus::Denies => FrontendStatus::NotCovered,
        _ => FrontendStatus::Unknown,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendCoverage {
    pub payer_id: String,
    pub test_id: String,
    pub coverage: FrontendStatus,
    pub confidence: f64,
    pub needs_review: bool,
    pub criteria: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub payer_id: String,
    pub test_id: String,
    pub status: ReconciledStatus,
    pub confidence: f64,
    pub reason: String,
}

/// Roll-up over many (payer, test) results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub total: usize,
    pub status_counts: BTreeMap<String, usize>,
    /// Mean over results that had at least one assertion.
    pub average_confidence: f64,
    pub conflict_count: usize,
    pub review: Vec<ReviewItem>,
    pub export: Vec<FrontendCoverage>,
}

pub fn summarize(results: &[ReconciliationResult], review_threshold: f64) -> CoverageSummary {
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut confidence_sum = 0.0;
    let mut scored = 0usize;
    let mut review = Vec::new();
    let mut export = Vec::with_capacity(results.len());

    for r in results {
        *status_counts.entry(r.status.as_str().to_string()).or_default() += 1;
        if r.status != ReconciledStatus::Unknown {
            confidence_sum += r.confidence;
            scored += 1;
        }

        let gate = check_publish_gate(r, review_threshold);
        if let PublishGate::HoldForReview { reason } = &gate {
            review.push(ReviewItem {
                payer_id: r.payer_id.clone(),
                test_id: r.test_id.clone(),
                status: r.status,
                confidence: r.confidence,
                reason: reason.clone(),
            });
        }

        let top = r.authoritative.as_ref();
        export.push(FrontendCoverage {
            payer_id: r.payer_id.clone(),
            test_id: r.test_id.clone(),
            coverage: frontend_status(r.status),
            confidence: r.confidence,
            needs_review: !gate.is_publishable(),
            criteria: top.and_then(|a| a.criteria.clone()),
            source_url: top.and_then(|a| a.source_url.clone()),
        });
    }

    let average_confidence = if scored == 0 {
        0.0
    } else {
        ((confidence_sum / scored as f64) * 10_000.0).round() / 10_000.0
    };

    CoverageSummary {
        total: results.len(),
        status_counts,
        average_confidence,
        conflict_count: results.iter().filter(|r| r.has_conflict).count(),
        review,
        export,
    }
}
