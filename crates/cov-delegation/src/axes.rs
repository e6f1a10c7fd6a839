use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    DelegationDetection, DelegationRecord, Effectiveness, EvidenceBasis, EvidenceLevel,
    LegacyStatus,
};

/// Knobs for the evidence axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidencePolicy {
    /// Verification or detection older than this no longer counts.
    pub decay_days: i64,
    /// A single detection strictly above this confirms evidence.
    pub detection_confidence: f64,
}

impl Default for EvidencePolicy {
    fn default() -> Self {
        Self {
            decay_days: 90,
            detection_confidence: 0.8,
        }
    }
}

/// Resolved evidence axis plus the reasoning behind it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvidenceResolution {
    pub level: EvidenceLevel,
    pub basis: EvidenceBasis,
    pub notes: Vec<String>,
}

/// Effectiveness on `today`. The end date is inclusive.
pub fn effectiveness_on(record: &DelegationRecord, today: NaiveDate) -> Effectiveness {
    if record.effective_end_date.is_some_and(|end| today > end) {
        return Effectiveness::Expired;
    }
    if record.effective_date.is_some_and(|start| today < start) {
        return Effectiveness::Pending;
    }
    Effectiveness::Effective
}

/// Project both axes onto the legacy single status.
///
/// | effectiveness | evidence  | legacy    |
/// |---------------|-----------|-----------|
/// | expired       | any       | expired   |
/// | effective     | confirmed | active    |
/// | otherwise     | confirmed | confirmed |
/// | otherwise     | suspected | suspected |
pub fn legacy_status(evidence: EvidenceLevel, effectiveness: Effectiveness) -> LegacyStatus {
    match (effectiveness, evidence) {
        (Effectiveness::Expired, _) => LegacyStatus::Expired,
        (Effectiveness::Effective, EvidenceLevel::Confirmed) => LegacyStatus::Active,
        (_, EvidenceLevel::Confirmed) => LegacyStatus::Confirmed,
        (_, EvidenceLevel::Suspected) => LegacyStatus::Suspected,
    }
}

/// Resolve the evidence axis from the seed record and crawler detections.
///
/// Confirmed when any of these hold inside the decay window:
/// - the record was seeded confirmed and `last_verified` is fresh,
/// - a detection naming the same delegate has confidence above the threshold,
/// - two detections naming the same delegate come from distinct sources.
///
/// A record seeded confirmed with nothing fresh behind it decays to suspected.
pub fn resolve_evidence(
    record: Option<&DelegationRecord>,
    detections: &[DelegationDetection],
    policy: &EvidencePolicy,
    today: NaiveDate,
) -> EvidenceResolution {
    let mut notes = Vec::new();
    let fresh = |d: NaiveDate| (today - d).num_days() <= policy.decay_days;

    let expected = record.map(|r| normalize_party(&r.delegates_to));
    let mut relevant: Vec<&DelegationDetection> = Vec::new();
    for det in detections {
        if !fresh(det.detected_at.date_naive()) {
            continue;
        }
        match &expected {
            Some(want) if *want != normalize_party(&det.delegated_to) => {
                notes.push(format!(
                    "ignored detection naming '{}' (record names '{}')",
                    det.delegated_to,
                    record.map(|r| r.delegates_to.as_str()).unwrap_or_default()
                ));
            }
            _ => relevant.push(det),
        }
    }

    if let Some(r) = record {
        if r.evidence_level == EvidenceLevel::Confirmed && r.last_verified.is_some_and(fresh) {
            return EvidenceResolution {
                level: EvidenceLevel::Confirmed,
                basis: EvidenceBasis::ManualVerification,
                notes,
            };
        }
    }

    if let Some(best) = relevant
        .iter()
        .filter(|d| d.confidence > policy.detection_confidence)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    {
        notes.push(format!(
            "confirmed by detection (confidence {:.2}) on {}",
            best.confidence,
            best.detected_at.date_naive()
        ));
        return EvidenceResolution {
            level: EvidenceLevel::Confirmed,
            basis: EvidenceBasis::HighConfidenceDetection,
            notes,
        };
    }

    let mut sources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for det in &relevant {
        let src = det
            .source_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| det.evidence.trim().to_string());
        if !src.is_empty() {
            sources
                .entry(normalize_party(&det.delegated_to))
                .or_default()
                .insert(src);
        }
    }
    if sources.values().any(|s| s.len() >= 2) {
        notes.push("confirmed by corroborating detections from distinct sources".to_string());
        return EvidenceResolution {
            level: EvidenceLevel::Confirmed,
            basis: EvidenceBasis::CorroboratedDetections,
            notes,
        };
    }

    if record.is_some_and(|r| r.evidence_level == EvidenceLevel::Confirmed) {
        notes.push(format!(
            "seeded confirmation not verified within {} days; treated as suspected",
            policy.decay_days
        ));
        return EvidenceResolution {
            level: EvidenceLevel::Suspected,
            basis: EvidenceBasis::Decayed,
            notes,
        };
    }

    EvidenceResolution {
        level: EvidenceLevel::Suspected,
        basis: EvidenceBasis::Unverified,
        notes,
    }
}

fn normalize_party(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
