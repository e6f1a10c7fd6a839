use cov_delegation::DelegationRouting;
use cov_reconcile::*;
use cov_schemas::{AssertionStatus, CoverageAssertion, Layer};

fn result(payer: &str, test: &str, input: &[(Layer, AssertionStatus, f64)]) -> ReconciliationResult {
    let assertions: Vec<CoverageAssertion> = input
        .iter()
        .enumerate()
        .map(|(i, (layer, status, c))| {
            CoverageAssertion::new(format!("{payer}-{i}"), payer, test, layer.clone(), status.clone(), *c)
                .with_source(format!("https://{payer}.example/policy"), "quote")
                .with_criteria("stage II-III colorectal cancer")
        })
        .collect();
    reconcile(payer, test, &assertions, &DelegationRouting::none("none"))
}

#[test]
fn summary_counts_reviews_and_exports() {
    use AssertionStatus::*;
    let results = vec![
        result("aetna", "signatera", &[(Layer::UmCriteria, Supports, 0.9)]),
        result("cigna", "signatera", &[(Layer::PolicyStance, Restricts, 0.7)]),
        result(
            "uhc",
            "signatera",
            &[(Layer::UmCriteria, Supports, 0.9), (Layer::PolicyStance, Denies, 0.9)],
        ),
        result("humana", "signatera", &[]),
    ];

    let summary = summarize(&results, 0.5);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.status_counts["supports"], 1);
    assert_eq!(summary.status_counts["restricts"], 1);
    assert_eq!(summary.status_counts["conflict_review_required"], 1);
    assert_eq!(summary.status_counts["unknown"], 1);
    assert_eq!(summary.conflict_count, 1);

    // aetna 0.95, cigna 0.90, uhc 0.50; humana excluded from the mean.
    assert!((summary.average_confidence - 0.7833).abs() < 1e-9);

    let reviewed: Vec<&str> = summary.review.iter().map(|r| r.payer_id.as_str()).collect();
    assert_eq!(reviewed, vec!["uhc", "humana"]);

    let coverage: Vec<FrontendStatus> = summary.export.iter().map(|e| e.coverage).collect();
    assert_eq!(
        coverage,
        vec![
            FrontendStatus::Covered,
            FrontendStatus::Conditional,
            FrontendStatus::Unknown,
            FrontendStatus::Unknown,
        ]
    );
    assert!(summary.export[2].needs_review);
    assert_eq!(
        summary.export[0].criteria.as_deref(),
        Some("stage II-III colorectal cancer")
    );

    let v = serde_json::to_value(&summary.export[1]).unwrap();
    assert_eq!(v["coverage"], "conditional");
    assert_eq!(v["payerId"], "cigna");
}

#[test]
fn low_confidence_is_held() {
    use AssertionStatus::*;
    // denies vs restricts is medium: definite status at 0.70 - 0.15.
    let r = result(
        "bcbs",
        "reveal",
        &[(Layer::UmCriteria, Denies, 0.5), (Layer::Overlay, Restricts, 0.5)],
    );
    assert_eq!(r.status, ReconciledStatus::Denies);
    assert!((r.confidence - 0.55).abs() < 1e-9);

    assert!(check_publish_gate(&r, 0.5).is_publishable());
    match check_publish_gate(&r, 0.6) {
        PublishGate::HoldForReview { reason } => assert!(reason.contains("below review threshold")),
        other => panic!("expected hold, got {other:?}"),
    }
    assert_eq!(frontend_status(r.status), FrontendStatus::NotCovered);
}
