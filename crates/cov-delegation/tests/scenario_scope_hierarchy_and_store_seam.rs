use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use cov_delegation::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
}

#[test]
fn broader_scope_covers_narrower_query() {
    use DelegationScope::*;
    assert!(LabBenefits.covers(GeneticTesting));
    assert!(LabBenefits.covers(MolecularTesting));
    assert!(MolecularTesting.covers(MolecularGenomicTesting));
    assert!(MolecularGenomicTesting.covers(GeneticTesting));
    assert!(GeneticTesting.covers(GeneticTesting));

    assert!(!GeneticTesting.covers(MolecularTesting));
    assert!(!MolecularTesting.covers(LabBenefits));
}

#[test]
fn is_delegated_uses_scope_and_activity() {
    let reg = DelegationRegistry::with_records(
        [
            DelegationRecord::new("bcbs-ma", "Carelon")
                .with_scope(DelegationScope::MolecularTesting)
                .with_lines_of_business(["all"])
                .confirmed(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()),
            DelegationRecord::new("suspect-co", "eviCore")
                .with_lines_of_business(["all"]),
        ],
        Arc::new(InMemoryDelegationStore::new()),
        EvidencePolicy::default(),
    )
    .unwrap();

    assert!(reg.is_delegated("bcbs-ma", DelegationScope::GeneticTesting, today()));
    assert!(reg.is_delegated("bcbs-ma", DelegationScope::MolecularTesting, today()));
    assert!(!reg.is_delegated("bcbs-ma", DelegationScope::LabBenefits, today()));

    // Suspected only: not delegated for any scope.
    assert!(!reg.is_delegated("suspect-co", DelegationScope::GeneticTesting, today()));
    assert!(!reg.is_delegated("nobody", DelegationScope::GeneticTesting, today()));
}

/// Test double that counts reads to prove the registry consults the
/// injected store rather than any global state.
#[derive(Default)]
struct CountingStore {
    map: Mutex<BTreeMap<String, DetectedEvidence>>,
    reads: Mutex<usize>,
}

impl DelegationStore for CountingStore {
    fn get(&self, payer_id: &str) -> Option<DetectedEvidence> {
        *self.reads.lock().unwrap() += 1;
        self.map.lock().unwrap().get(payer_id).cloned()
    }

    fn put(&self, payer_id: &str, evidence: DetectedEvidence) {
        self.map.lock().unwrap().insert(payer_id.to_string(), evidence);
    }
}

#[test]
fn registry_reads_through_injected_store() {
    let store = Arc::new(CountingStore::default());
    store.put(
        "uhc",
        DetectedEvidence {
            detections: vec![DelegationDetection {
                delegated_to: "Optum".to_string(),
                confidence: 0.95,
                detected_at: Utc.with_ymd_and_hms(2025, 8, 20, 0, 0, 0).unwrap(),
                evidence: "bulletin".to_string(),
                source_url: None,
            }],
        },
    );

    let reg = DelegationRegistry::with_records(
        [DelegationRecord::new("uhc", "Optum").with_lines_of_business(["commercial"])],
        store.clone(),
        EvidencePolicy::default(),
    )
    .unwrap();

    let routing = reg.routing("uhc", Some("commercial"), today());
    assert!(routing.active);
    assert_eq!(*store.reads.lock().unwrap(), 1);

    // Default `append` goes through get + put.
    reg.record_detection(
        "uhc",
        DelegationDetection {
            delegated_to: "Optum".to_string(),
            confidence: 0.5,
            detected_at: Utc.with_ymd_and_hms(2025, 8, 21, 0, 0, 0).unwrap(),
            evidence: String::new(),
            source_url: None,
        },
    );
    assert_eq!(store.get("uhc").unwrap().detections.len(), 2);
}

#[test]
fn routing_serializes_with_wire_names() {
    let routing = DelegationRouting::none("no delegation registered");
    let v = serde_json::to_value(&routing).unwrap();
    assert_eq!(v["active"], false);
    assert_eq!(v["boostLBM"], false);
    assert_eq!(v["lobApplicable"], true);
    assert_eq!(v["boost"], "none");
}
