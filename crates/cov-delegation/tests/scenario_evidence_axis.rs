//! Evidence axis: upgrade by detection, corroboration, decay; and its
//! independence from the effectiveness axis.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use cov_delegation::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn detection(to: &str, confidence: f64, on: NaiveDate, url: &str) -> DelegationDetection {
    DelegationDetection {
        delegated_to: to.to_string(),
        confidence,
        detected_at: Utc
            .from_utc_datetime(&on.and_hms_opt(9, 0, 0).unwrap()),
        evidence: "Effective 1/1, lab benefits managed by the LBM".to_string(),
        source_url: Some(url.to_string()),
    }
}

fn suspected_record() -> DelegationRecord {
    DelegationRecord::new("uhc", "Optum Lab Benefit Mgmt").with_lines_of_business(["all"])
}

fn registry(records: Vec<DelegationRecord>) -> DelegationRegistry {
    DelegationRegistry::with_records(
        records,
        Arc::new(InMemoryDelegationStore::new()),
        EvidencePolicy::default(),
    )
    .unwrap()
}

#[test]
fn suspected_record_gives_tie_break_only() {
    let reg = registry(vec![suspected_record()]);
    let routing = reg.routing("uhc", None, d(2025, 6, 1));
    assert!(!routing.active);
    assert!(routing.suspected);
    assert_eq!(routing.boost, LbmBoost::TieBreak);
    assert!(!routing.boost_lbm);
}

#[test]
fn high_confidence_detection_upgrades_to_confirmed() {
    let reg = registry(vec![suspected_record()]);
    reg.record_detection(
        "uhc",
        detection("optum lab-benefit mgmt", 0.93, d(2025, 5, 20), "https://uhc.example/bulletin"),
    );

    let status = reg.status("uhc", None, d(2025, 6, 1));
    assert_eq!(status.evidence_level, EvidenceLevel::Confirmed);
    assert_eq!(status.evidence_basis, EvidenceBasis::HighConfidenceDetection);
    assert!(reg.routing("uhc", None, d(2025, 6, 1)).active);
}

#[test]
fn detection_at_threshold_does_not_upgrade() {
    let reg = registry(vec![suspected_record()]);
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.8, d(2025, 5, 20), "https://uhc.example/a"),
    );
    let status = reg.status("uhc", None, d(2025, 6, 1));
    assert_eq!(status.evidence_level, EvidenceLevel::Suspected);
}

#[test]
fn two_distinct_sources_corroborate() {
    let reg = registry(vec![suspected_record()]);
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.6, d(2025, 5, 1), "https://uhc.example/a"),
    );
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.7, d(2025, 5, 10), "https://provider-news.example/b"),
    );
    let status = reg.status("uhc", None, d(2025, 6, 1));
    assert_eq!(status.evidence_basis, EvidenceBasis::CorroboratedDetections);
    assert_eq!(status.evidence_level, EvidenceLevel::Confirmed);
}

#[test]
fn same_source_twice_is_not_corroboration() {
    let reg = registry(vec![suspected_record()]);
    for day in [1, 2] {
        reg.record_detection(
            "uhc",
            detection("Optum Lab Benefit Mgmt", 0.6, d(2025, 5, day), "https://uhc.example/a"),
        );
    }
    assert_eq!(
        reg.status("uhc", None, d(2025, 6, 1)).evidence_level,
        EvidenceLevel::Suspected
    );
}

#[test]
fn stale_detection_does_not_count() {
    let reg = registry(vec![suspected_record()]);
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.95, d(2025, 1, 1), "https://uhc.example/a"),
    );
    assert_eq!(
        reg.status("uhc", None, d(2025, 6, 1)).evidence_level,
        EvidenceLevel::Suspected
    );
}

#[test]
fn detection_for_another_delegate_is_ignored() {
    let reg = registry(vec![suspected_record()]);
    reg.record_detection(
        "uhc",
        detection("eviCore", 0.99, d(2025, 5, 20), "https://uhc.example/a"),
    );
    let status = reg.status("uhc", None, d(2025, 6, 1));
    assert_eq!(status.evidence_level, EvidenceLevel::Suspected);
    assert!(status.notes.iter().any(|n| n.contains("eviCore")));
}

#[test]
fn seeded_confirmation_decays_after_window() {
    let rec = suspected_record().confirmed(d(2025, 1, 1));
    let reg = registry(vec![rec]);

    let fresh = reg.status("uhc", None, d(2025, 3, 1));
    assert_eq!(fresh.evidence_level, EvidenceLevel::Confirmed);
    assert_eq!(fresh.evidence_basis, EvidenceBasis::ManualVerification);

    let stale = reg.status("uhc", None, d(2025, 6, 1));
    assert_eq!(stale.evidence_level, EvidenceLevel::Suspected);
    assert_eq!(stale.evidence_basis, EvidenceBasis::Decayed);
    assert_eq!(stale.legacy_status, Some(LegacyStatus::Suspected));

    // A fresh detection re-confirms it.
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.9, d(2025, 5, 30), "https://uhc.example/a"),
    );
    assert_eq!(
        reg.status("uhc", None, d(2025, 6, 1)).evidence_level,
        EvidenceLevel::Confirmed
    );
}

#[test]
fn expiry_wins_regardless_of_evidence() {
    let rec = suspected_record()
        .confirmed(d(2025, 6, 1))
        .effective_between(Some(d(2024, 1, 1)), Some(d(2025, 5, 31)));
    let reg = registry(vec![rec]);

    let status = reg.status("uhc", None, d(2025, 6, 15));
    assert_eq!(status.evidence_level, EvidenceLevel::Confirmed);
    assert_eq!(status.effectiveness, Some(Effectiveness::Expired));
    assert_eq!(status.legacy_status, Some(LegacyStatus::Expired));

    let routing = reg.routing("uhc", None, d(2025, 6, 15));
    assert!(!routing.active);
    assert!(!routing.suspected);
    assert_eq!(routing.boost, LbmBoost::None);
}

#[test]
fn pending_confirmed_is_not_active() {
    let rec = suspected_record()
        .confirmed(d(2025, 6, 1))
        .effective_between(Some(d(2026, 1, 1)), None);
    let reg = registry(vec![rec]);

    let status = reg.status("uhc", None, d(2025, 6, 15));
    assert_eq!(status.effectiveness, Some(Effectiveness::Pending));
    assert_eq!(status.legacy_status, Some(LegacyStatus::Confirmed));
    assert!(!reg.routing("uhc", None, d(2025, 6, 15)).active);
}

#[test]
fn detection_without_record_is_never_active() {
    let reg = registry(vec![]);
    reg.record_detection(
        "aetna",
        detection("Avalon", 0.99, d(2025, 5, 20), "https://aetna.example/news"),
    );
    let status = reg.status("aetna", None, d(2025, 6, 1));
    assert!(!status.registered);
    assert_eq!(status.evidence_level, EvidenceLevel::Confirmed);
    assert_eq!(status.evidence_basis, EvidenceBasis::HighConfidenceDetection);
    assert_eq!(status.effectiveness, None);

    let routing = reg.routing("aetna", None, d(2025, 6, 1));
    assert!(!routing.active);
    assert!(routing.suspected);
    assert_eq!(routing.delegated_to.as_deref(), Some("Avalon"));

    // A LOB-specific query cannot match without seeded lines of business.
    let lob = reg.routing("aetna", Some("commercial"), d(2025, 6, 1));
    assert!(!lob.lob_applicable);
    assert!(!lob.suspected);
}

#[test]
fn unregistered_evidence_level_matches_its_basis() {
    let reg = registry(vec![]);
    reg.record_detection(
        "humana",
        detection("Avalon", 0.95, d(2025, 5, 20), "https://humana.example/a"),
    );
    let status = reg.status("humana", None, d(2025, 6, 1));
    assert_eq!(status.evidence_level, EvidenceLevel::Confirmed);
    assert_eq!(status.evidence_basis, EvidenceBasis::HighConfidenceDetection);
    assert_eq!(status.legacy_status, Some(LegacyStatus::Confirmed));
    assert!(status.notes.iter().all(|n| !n.contains("treated as suspected")));

    let routing = reg.routing("humana", None, d(2025, 6, 1));
    assert!(!routing.active);
    assert!(!routing.boost_lbm);
    assert_eq!(routing.boost, LbmBoost::TieBreak);
    assert!(routing.routing_note.contains("without a seeded record"));

    // A weak detection alone stays suspected and unverified.
    let weak = registry(vec![]);
    weak.record_detection(
        "cigna",
        detection("eviCore", 0.5, d(2025, 5, 20), "https://cigna.example/a"),
    );
    let status = weak.status("cigna", None, d(2025, 6, 1));
    assert_eq!(status.evidence_level, EvidenceLevel::Suspected);
    assert_eq!(status.evidence_basis, EvidenceBasis::Unverified);
    assert_eq!(status.legacy_status, Some(LegacyStatus::Suspected));
}

#[test]
fn payer_ids_are_trimmed_on_every_path() {
    let reg = registry(vec![DelegationRecord::new(" humana ", "Avalon")
        .with_lines_of_business(["all"])]);
    let status = reg.status(" humana", None, d(2025, 6, 1));
    assert!(status.registered);
    assert_eq!(status.payer_id, "humana");
    assert!(reg.record("humana ").is_some());

    reg.record_detection(
        "humana\t",
        detection("Avalon", 0.95, d(2025, 5, 20), "https://humana.example/a"),
    );
    assert_eq!(reg.detections("humana").len(), 1);
    assert_eq!(reg.detections(" humana ").len(), 1);
    assert!(reg.routing(" humana", None, d(2025, 6, 1)).active);
}

#[test]
fn detections_outside_the_window_are_pruned_on_record() {
    let reg = registry(vec![suspected_record()]);
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.6, d(2025, 1, 1), "https://uhc.example/old"),
    );
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.6, d(2025, 3, 1), "https://uhc.example/mid"),
    );
    assert_eq!(reg.detections("uhc").len(), 2);

    // 2025-06-01 is 151 days after the first and 92 after the second.
    reg.record_detection(
        "uhc",
        detection("Optum Lab Benefit Mgmt", 0.6, d(2025, 6, 1), "https://uhc.example/new"),
    );
    let kept = reg.detections("uhc");
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].source_url.as_deref(), Some("https://uhc.example/new"));
}

#[test]
fn detections_are_capped_per_payer() {
    let reg = registry(vec![suspected_record()]);
    let start = d(2025, 5, 1);
    for i in 0..(MAX_DETECTIONS_PER_PAYER + 10) {
        let mut det = detection("Optum Lab Benefit Mgmt", 0.5, start, "https://uhc.example/a");
        det.detected_at += chrono::Duration::minutes(i as i64);
        reg.record_detection("uhc", det);
    }
    let kept = reg.detections("uhc");
    assert_eq!(kept.len(), MAX_DETECTIONS_PER_PAYER);
    let oldest = kept.iter().map(|d| d.detected_at).min().unwrap();
    assert_eq!(
        oldest,
        Utc.from_utc_datetime(&start.and_hms_opt(9, 10, 0).unwrap())
    );
}

#[test]
fn invalid_seed_is_rejected() {
    let bad = DelegationRecord::new("p", "lbm")
        .effective_between(Some(d(2025, 6, 1)), Some(d(2025, 1, 1)));
    let err = DelegationRegistry::with_records(
        [bad],
        Arc::new(InMemoryDelegationStore::new()),
        EvidencePolicy::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.payer_id, "p");
    assert!(err.to_string().contains("precedes"));
}
