//! supports vs denies is never auto-resolved, whichever side ranks higher
//! and whatever order the assertions arrive in.

use cov_delegation::DelegationRouting;
use cov_reconcile::*;
use cov_schemas::{AssertionStatus, CoverageAssertion, Layer};

fn assertion(id: &str, layer: Layer, status: AssertionStatus, confidence: f64) -> CoverageAssertion {
    CoverageAssertion::new(id, "aetna", "signatera", layer, status, confidence)
}

fn no_delegation() -> DelegationRouting {
    DelegationRouting::none("no delegation registered")
}

#[test]
fn um_supports_vs_policy_denies_escalates() {
    let input = vec![
        assertion("a1", Layer::UmCriteria, AssertionStatus::Supports, 0.85),
        assertion("a2", Layer::PolicyStance, AssertionStatus::Denies, 0.9),
    ];
    let r = reconcile("aetna", "signatera", &input, &no_delegation());

    assert_eq!(r.status, ReconciledStatus::ConflictReviewRequired);
    assert!(r.has_conflict);
    assert!(r.needs_review());
    assert_eq!(r.conflicts[0].severity, ConflictSeverity::High);
    assert_eq!(r.conflicts[0].higher.assertion_id, "a1");
    assert_eq!(r.conflicts[0].lower.assertion_id, "a2");

    // 0.70 - 0.30 + 0.10 (top confidence 0.85)
    assert!((r.confidence - 0.50).abs() < 1e-9);

    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["status"], "conflict_review_required");
    assert_eq!(v["hasConflict"], true);
    assert_eq!(v["conflicts"][0]["severity"], "high");
}

#[test]
fn order_does_not_change_the_outcome() {
    let forward = vec![
        assertion("a1", Layer::UmCriteria, AssertionStatus::Supports, 0.85),
        assertion("a2", Layer::PolicyStance, AssertionStatus::Denies, 0.9),
        assertion("a3", Layer::VendorClaim, AssertionStatus::Supports, 0.99),
        assertion("a4", Layer::Overlay, AssertionStatus::Unclear, 0.4),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();

    let a = reconcile("aetna", "signatera", &forward, &no_delegation());
    let b = reconcile("aetna", "signatera", &reversed, &no_delegation());
    assert_eq!(a, b);

    let denies_first = vec![
        assertion("x", Layer::PolicyStance, AssertionStatus::Denies, 0.5),
        assertion("y", Layer::PolicyStance, AssertionStatus::Supports, 0.5),
    ];
    let r = reconcile("aetna", "signatera", &denies_first, &no_delegation());
    assert_eq!(r.conflicts[0].severity, ConflictSeverity::High);
}

#[test]
fn conflicts_sorted_high_first() {
    let input = vec![
        assertion("a1", Layer::UmCriteria, AssertionStatus::Unclear, 0.6),
        assertion("a2", Layer::LbmGuideline, AssertionStatus::Restricts, 0.6),
        assertion("a3", Layer::PolicyStance, AssertionStatus::Supports, 0.6),
        assertion("a4", Layer::Overlay, AssertionStatus::Denies, 0.6),
    ];
    let r = reconcile("aetna", "signatera", &input, &no_delegation());
    let severities: Vec<ConflictSeverity> = r.conflicts.iter().map(|c| c.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
    assert_eq!(r.worst_conflict(), Some(ConflictSeverity::High));
    assert_eq!(r.status, ReconciledStatus::ConflictReviewRequired);
    // unclear→restricts, unclear→supports, restricts→supports, unclear→denies,
    // restricts→denies, supports→denies
    assert_eq!(r.conflicts.len(), 6);
}
