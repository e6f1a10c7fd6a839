//! Line-of-business filtering: absence of a match means delegation does not
//! apply, never the reverse.

use std::sync::Arc;

use chrono::NaiveDate;
use cov_delegation::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn today() -> NaiveDate {
    d(2025, 9, 1)
}

fn registry(record: DelegationRecord) -> DelegationRegistry {
    DelegationRegistry::with_records(
        [record],
        Arc::new(InMemoryDelegationStore::new()),
        EvidencePolicy::default(),
    )
    .unwrap()
}

fn commercial_only() -> DelegationRecord {
    DelegationRecord::new("bcbs-nc", "Carelon")
        .confirmed(d(2025, 8, 15))
        .with_lines_of_business(["commercial"])
        .effective_between(Some(d(2025, 1, 1)), None)
}

#[test]
fn other_lob_is_not_applicable_and_not_boosted() {
    let reg = registry(commercial_only());

    let routing = reg.routing("bcbs-nc", Some("medicare_advantage"), today());
    assert!(!routing.active);
    assert!(!routing.lob_applicable);
    assert!(!routing.boost_lbm);
    assert_eq!(routing.boost, LbmBoost::None);
    assert!(routing.routing_note.contains("medicare_advantage"));

    let status = reg.status("bcbs-nc", Some("Medicare Advantage"), today());
    assert!(!status.lob_applicable);
    // The axes are still reported: LOB filtering changes applicability only.
    assert_eq!(status.evidence_level, EvidenceLevel::Confirmed);
    assert_eq!(status.legacy_status, Some(LegacyStatus::Active));
}

#[test]
fn matching_lob_is_active() {
    let reg = registry(commercial_only());
    let routing = reg.routing("bcbs-nc", Some("Commercial"), today());
    assert!(routing.active);
    assert!(routing.boost_lbm);
    assert_eq!(routing.boost, LbmBoost::Full);
    assert_eq!(routing.delegated_to.as_deref(), Some("Carelon"));
}

#[test]
fn all_lob_matches_any_query() {
    let reg = registry(
        DelegationRecord::new("anthem", "Carelon")
            .confirmed(d(2025, 8, 1))
            .with_lines_of_business(["all"]),
    );
    assert!(reg.routing("anthem", Some("medicaid"), today()).active);
    assert!(reg.routing("anthem", Some("exchange"), today()).active);
}

#[test]
fn empty_lob_set_matches_no_specific_lob() {
    let reg = registry(DelegationRecord::new("cigna", "eviCore").confirmed(d(2025, 8, 1)));
    let routing = reg.routing("cigna", Some("commercial"), today());
    assert!(!routing.lob_applicable);
    assert!(!routing.active);

    // Without a LOB query the record applies.
    assert!(reg.routing("cigna", None, today()).active);
}

#[test]
fn unknown_payer_routes_inactive() {
    let reg = registry(commercial_only());
    let routing = reg.routing("humana", Some("commercial"), today());
    assert_eq!(routing.active, false);
    assert_eq!(routing.suspected, false);
    assert!(routing.lob_applicable);
    assert_eq!(routing.boost, LbmBoost::None);
}
