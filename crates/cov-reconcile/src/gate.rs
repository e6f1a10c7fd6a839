//! Publish gate.
//!
//! Every reconciled result that leaves this system for a coverage display or
//! export passes through [`check_publish_gate`]. Contradictions and results
//! without a definite stance are held for a human.

use crate::types::{ReconciledStatus, ReconciliationResult};

/// Outcome of the publish gate for one result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishGate {
    Publish,
    /// Must not be shown as a coverage answer until a reviewer decides.
    HoldForReview { reason: String },
}

impl PublishGate {
    pub fn is_publishable(&self) -> bool {
        matches!(self, PublishGate::Publish)
    }
}

/// `review_threshold`: results below this confidence are held even with a
/// definite status.
pub fn check_publish_gate(result: &ReconciliationResult, review_threshold: f64) -> PublishGate {
    let reason = match result.status {
        ReconciledStatus::ConflictReviewRequired => Some(format!(
            "high-severity conflict between sources ({} conflict(s))",
            result.conflicts.len()
        )),
        ReconciledStatus::Unknown => Some("no coverage assertions".to_string()),
        ReconciledStatus::Unclear => Some("no definite coverage stance".to_string()),
        _ if result.confidence < review_threshold => Some(format!(
            "confidence {:.2} below review threshold {:.2}",
            result.confidence, review_threshold
        )),
        _ => None,
    };

    match reason {
        Some(reason) => PublishGate::HoldForReview { reason },
        None => PublishGate::Publish,
    }
}
