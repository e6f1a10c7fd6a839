use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use cov_delegation::{DelegationRegistry, DelegationRouting};
use cov_schemas::{AssertionStatus, CoverageAssertion};

use crate::types::{
    Conflict, ConflictSeverity, ConflictSide, ReconciledStatus, ReconciliationResult,
    CONFIDENCE_CEILING, CONFIDENCE_FLOOR,
};
use crate::weights::LayerWeights;

const BASE_CONFIDENCE: f64 = 0.70;
const AGREEMENT_BONUS: f64 = 0.20;
const STRONG_TOP_BONUS: f64 = 0.10;
const STRONG_TOP_THRESHOLD: f64 = 0.80;
const UNCLEAR_TOP_PENALTY: f64 = 0.20;

/// Severity of a disagreement between two statuses, if any. Symmetric.
///
/// - supports vs denies: high
/// - supports vs restricts, restricts vs denies: medium
/// - unclear vs any definite status: low
///
/// Unrecognized statuses never conflict.
pub fn conflict_severity(a: &AssertionStatus, b: &AssertionStatus) -> Option<ConflictSeverity> {
    use AssertionStatus::*;
    match (a, b) {
        (Supports, Denies) | (Denies, Supports) => Some(ConflictSeverity::High),
        (Supports, Restricts) | (Restricts, Supports) => Some(ConflictSeverity::Medium),
        (Restricts, Denies) | (Denies, Restricts) => Some(ConflictSeverity::Medium),
        (Unclear, x) | (x, Unclear) if x.is_definite() => Some(ConflictSeverity::Low),
        _ => None,
    }
}

/// Reconcile every assertion for one (payer, test) under `routing`.
///
/// Pure: the result depends only on the arguments, never on input order.
pub fn reconcile(
    payer_id: &str,
    test_id: &str,
    assertions: &[CoverageAssertion],
    routing: &DelegationRouting,
) -> ReconciliationResult {
    let weights = LayerWeights::for_routing(routing);

    if assertions.is_empty() {
        return ReconciliationResult {
            payer_id: payer_id.to_string(),
            test_id: test_id.to_string(),
            status: ReconciledStatus::Unknown,
            confidence: 0.0,
            authoritative: None,
            supporting: Vec::new(),
            conflicts: Vec::new(),
            has_conflict: false,
            delegation: routing.clone(),
            weights: weights.as_map(),
            message: "no coverage assertions on file".to_string(),
        };
    }

    let ranked = rank(assertions, &weights);
    let conflicts = detect_conflicts(&ranked);
    let top = ranked[0];

    let status = resolve_status(&ranked, &conflicts);
    let confidence = score(&ranked, &conflicts);
    let message = describe(status, top, &conflicts, routing);

    if status == ReconciledStatus::ConflictReviewRequired {
        tracing::warn!(
            payer_id,
            test_id,
            conflicts = conflicts.len(),
            "coverage contradiction requires human review"
        );
    } else {
        tracing::debug!(payer_id, test_id, status = %status, confidence, "reconciled");
    }

    ReconciliationResult {
        payer_id: payer_id.to_string(),
        test_id: test_id.to_string(),
        status,
        confidence,
        authoritative: Some(top.clone()),
        supporting: ranked[1..].iter().map(|a| (*a).clone()).collect(),
        has_conflict: !conflicts.is_empty(),
        conflicts,
        delegation: routing.clone(),
        weights: weights.as_map(),
        message,
    }
}

/// Look up routing for the pair in `registry` as of `today`, then reconcile.
pub fn reconcile_with_registry(
    registry: &DelegationRegistry,
    payer_id: &str,
    test_id: &str,
    line_of_business: Option<&str>,
    assertions: &[CoverageAssertion],
    today: NaiveDate,
) -> ReconciliationResult {
    let routing = registry.routing(payer_id, line_of_business, today);
    reconcile(payer_id, test_id, assertions, &routing)
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Weight desc, then confidence desc, then assertion id asc. The final key
/// makes ranking total so that input order never matters.
fn rank<'a>(assertions: &'a [CoverageAssertion], weights: &LayerWeights) -> Vec<&'a CoverageAssertion> {
    let mut ranked: Vec<&CoverageAssertion> = assertions.iter().collect();
    ranked.sort_by(|a, b| {
        weights
            .of(b)
            .total_cmp(&weights.of(a))
            .then_with(|| b.confidence().total_cmp(&a.confidence()))
            .then_with(|| a.assertion_id.cmp(&b.assertion_id))
            .then_with(|| tie_break_fields(a, b))
    });
    ranked
}

fn tie_break_fields(a: &CoverageAssertion, b: &CoverageAssertion) -> Ordering {
    a.layer
        .cmp(&b.layer)
        .then_with(|| a.status.cmp(&b.status))
        .then_with(|| a.source_url.cmp(&b.source_url))
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// Walk in rank order. Each assertion is compared against the first
/// (highest-ranked) assertion seen for every distinct status so far.
fn detect_conflicts(ranked: &[&CoverageAssertion]) -> Vec<Conflict> {
    let mut seen: BTreeMap<&AssertionStatus, &CoverageAssertion> = BTreeMap::new();
    let mut out = Vec::new();

    for a in ranked {
        for (status, first) in &seen {
            if let Some(severity) = conflict_severity(status, &a.status) {
                out.push(Conflict {
                    severity,
                    higher: ConflictSide::from(*first),
                    lower: ConflictSide::from(*a),
                    description: format!(
                        "{} ({}) says {}, {} ({}) says {}",
                        first.assertion_id,
                        first.layer,
                        first.status,
                        a.assertion_id,
                        a.layer,
                        a.status
                    ),
                });
            }
        }
        seen.entry(&a.status).or_insert(*a);
    }

    // Stable: within a severity, discovery order is kept.
    out.sort_by_key(|c| c.severity);
    out
}

// ---------------------------------------------------------------------------
// Status and confidence
// ---------------------------------------------------------------------------

fn resolve_status(ranked: &[&CoverageAssertion], conflicts: &[Conflict]) -> ReconciledStatus {
    if conflicts.iter().any(|c| c.severity == ConflictSeverity::High) {
        return ReconciledStatus::ConflictReviewRequired;
    }
    // An unclear top falls through to the first definite lower-ranked stance.
    ranked
        .iter()
        .find(|a| a.status.is_definite())
        .map(|a| ReconciledStatus::from_assertion(&a.status))
        .unwrap_or(ReconciledStatus::Unclear)
}

fn score(ranked: &[&CoverageAssertion], conflicts: &[Conflict]) -> f64 {
    let top = ranked[0];
    let mut confidence = BASE_CONFIDENCE;

    if ranked.iter().all(|a| a.status == top.status) {
        confidence += AGREEMENT_BONUS;
    }
    for c in conflicts {
        confidence -= c.severity.penalty();
    }
    if top.confidence() > STRONG_TOP_THRESHOLD {
        confidence += STRONG_TOP_BONUS;
    }
    if !top.status.is_definite() {
        confidence -= UNCLEAR_TOP_PENALTY;
    }

    round4(confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING))
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn describe(
    status: ReconciledStatus,
    top: &CoverageAssertion,
    conflicts: &[Conflict],
    routing: &DelegationRouting,
) -> String {
    let mut msg = match status {
        ReconciledStatus::ConflictReviewRequired => {
            let high = conflicts
                .iter()
                .filter(|c| c.severity == ConflictSeverity::High)
                .count();
            format!("{high} direct contradiction(s) between sources; human review required")
        }
        ReconciledStatus::Unclear => "no source takes a definite coverage stance".to_string(),
        s => format!("{s} per {} ({})", top.layer, top.assertion_id),
    };

    if status != ReconciledStatus::ConflictReviewRequired && !conflicts.is_empty() {
        msg.push_str(&format!("; {} lower-severity conflict(s)", conflicts.len()));
    }
    if routing.active || routing.suspected {
        msg.push_str("; ");
        msg.push_str(&routing.routing_note);
    }
    msg
}
