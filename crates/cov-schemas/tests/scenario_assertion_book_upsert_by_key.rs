use cov_schemas::*;

fn um(id: &str, status: AssertionStatus, conf: f64) -> CoverageAssertion {
    CoverageAssertion::new(id, "uhc", "signatera", Layer::UmCriteria, status, conf)
        .with_source("https://payer.example/um/mrd.pdf", "criteria text")
}

#[test]
fn same_key_replaces_and_bumps_version() {
    let mut book = AssertionBook::new();

    assert_eq!(
        book.upsert(um("a1", AssertionStatus::Restricts, 0.7)),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        book.upsert(um("a1", AssertionStatus::Supports, 0.9)),
        UpsertOutcome::Replaced { version: 2 }
    );
    assert_eq!(book.len(), 1);

    let current = book.for_pair("uhc", "signatera");
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].status, AssertionStatus::Supports);
}

#[test]
fn identical_resubmission_keeps_version() {
    let mut book = AssertionBook::new();
    book.upsert(um("a1", AssertionStatus::Supports, 0.9));
    book.upsert(um("a1", AssertionStatus::Denies, 0.9));

    assert_eq!(
        book.upsert(um("a1", AssertionStatus::Denies, 0.9)),
        UpsertOutcome::Unchanged { version: 2 }
    );
}

#[test]
fn different_source_url_is_a_distinct_assertion() {
    let mut book = AssertionBook::new();
    book.upsert(um("a1", AssertionStatus::Supports, 0.9));
    book.upsert(
        CoverageAssertion::new(
            "a2",
            "uhc",
            "signatera",
            Layer::UmCriteria,
            AssertionStatus::Restricts,
            0.8,
        )
        .with_source("https://payer.example/um/mrd-2025.pdf", "other"),
    );
    book.upsert(CoverageAssertion::new(
        "a3",
        "aetna",
        "signatera",
        Layer::PolicyStance,
        AssertionStatus::Denies,
        0.8,
    ));

    assert_eq!(book.for_pair("uhc", "signatera").len(), 2);
    assert_eq!(book.pairs().len(), 2);
}
