use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::axes::{effectiveness_on, legacy_status, resolve_evidence, EvidencePolicy};
use crate::store::DelegationStore;
use crate::types::{
    normalize_lob, DelegationDetection, DelegationRecord, DelegationRouting, DelegationScope,
    DelegationStatus, Effectiveness, EvidenceBasis, EvidenceLevel, InvalidDelegationRecord,
    LbmBoost,
};

/// Seeded delegation records plus the injected detected-evidence store.
///
/// Records are immutable after construction; only the store changes at
/// runtime, so the registry can be shared behind an `Arc` without locking.
pub struct DelegationRegistry {
    records: BTreeMap<String, DelegationRecord>,
    store: Arc<dyn DelegationStore>,
    policy: EvidencePolicy,
}

impl DelegationRegistry {
    pub fn new(store: Arc<dyn DelegationStore>, policy: EvidencePolicy) -> Self {
        Self {
            records: BTreeMap::new(),
            store,
            policy,
        }
    }

    pub fn with_records(
        records: impl IntoIterator<Item = DelegationRecord>,
        store: Arc<dyn DelegationStore>,
        policy: EvidencePolicy,
    ) -> Result<Self, InvalidDelegationRecord> {
        let mut reg = Self::new(store, policy);
        for r in records {
            reg.register(r)?;
        }
        Ok(reg)
    }

    /// Add or replace the seed record for a payer.
    pub fn register(&mut self, mut record: DelegationRecord) -> Result<(), InvalidDelegationRecord> {
        record.validate()?;
        record.payer_id = record.payer_id.trim().to_string();
        record.lines_of_business = record
            .lines_of_business
            .iter()
            .map(|l| normalize_lob(l))
            .collect();
        self.records.insert(record.payer_id.clone(), record);
        Ok(())
    }

    pub fn record(&self, payer_id: &str) -> Option<&DelegationRecord> {
        self.records.get(payer_id.trim())
    }

    pub fn payer_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn policy(&self) -> &EvidencePolicy {
        &self.policy
    }

    /// Crawl-loop write path. Detections outside the decay window of the
    /// newest one are pruned on the way in.
    pub fn record_detection(&self, payer_id: &str, detection: DelegationDetection) {
        let payer_id = payer_id.trim();
        debug!(
            payer_id,
            delegated_to = %detection.delegated_to,
            confidence = detection.confidence,
            "delegation detection recorded"
        );
        self.store.append(payer_id, detection, self.policy.decay_days);
    }

    /// Every detection on file for the payer, fresh or not.
    pub fn detections(&self, payer_id: &str) -> Vec<DelegationDetection> {
        self.store
            .get(payer_id.trim())
            .map(|e| e.detections)
            .unwrap_or_default()
    }

    /// Full diagnostic status for one payer and optional line of business.
    pub fn status(
        &self,
        payer_id: &str,
        line_of_business: Option<&str>,
        today: NaiveDate,
    ) -> DelegationStatus {
        let payer_id = payer_id.trim();
        let record = self.records.get(payer_id);
        let detections = self
            .store
            .get(payer_id)
            .map(|e| e.detections)
            .unwrap_or_default();
        let requested_lob = line_of_business
            .map(normalize_lob)
            .filter(|l| !l.is_empty());

        let Some(record) = record else {
            return self.unregistered_status(payer_id, &detections, requested_lob, today);
        };

        let evidence = resolve_evidence(Some(record), &detections, &self.policy, today);
        let mut notes = evidence.notes;
        match evidence.basis {
            EvidenceBasis::HighConfidenceDetection | EvidenceBasis::CorroboratedDetections
                if record.evidence_level == EvidenceLevel::Suspected =>
            {
                debug!(payer_id, basis = ?evidence.basis, "delegation evidence upgraded to confirmed");
            }
            EvidenceBasis::Decayed => {
                debug!(payer_id, "delegation evidence decayed to suspected");
            }
            _ => {}
        }

        let effectiveness = effectiveness_on(record, today);
        match effectiveness {
            Effectiveness::Pending => notes.push(format!(
                "delegation to {} not yet effective (starts {})",
                record.delegates_to,
                record
                    .effective_date
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            )),
            Effectiveness::Expired => notes.push(format!(
                "delegation to {} expired {}",
                record.delegates_to,
                record
                    .effective_end_date
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            )),
            Effectiveness::Effective => {}
        }

        let lob_applicable = match &requested_lob {
            None => true,
            Some(lob) => record.applies_to_lob(lob),
        };
        if !lob_applicable {
            notes.push(format!(
                "delegation covers lines of business {:?}; not applicable to '{}'",
                record.lines_of_business,
                requested_lob.as_deref().unwrap_or_default()
            ));
        }

        DelegationStatus {
            payer_id: payer_id.to_string(),
            registered: true,
            delegated_to: Some(record.delegates_to.clone()),
            evidence_level: evidence.level,
            evidence_basis: evidence.basis,
            effectiveness: Some(effectiveness),
            legacy_status: Some(legacy_status(evidence.level, effectiveness)),
            scope: Some(record.scope),
            requested_lob,
            lob_applicable,
            notes,
        }
    }

    /// Detections without a seed record. Evidence is graded as usual, but
    /// dates and LOB scope are unknown, so nothing here can activate routing.
    fn unregistered_status(
        &self,
        payer_id: &str,
        detections: &[DelegationDetection],
        requested_lob: Option<String>,
        today: NaiveDate,
    ) -> DelegationStatus {
        let evidence = resolve_evidence(None, detections, &self.policy, today);
        let latest = detections
            .iter()
            .filter(|d| (today - d.detected_at.date_naive()).num_days() <= self.policy.decay_days)
            .max_by_key(|d| d.detected_at);

        let mut notes = evidence.notes;
        let delegated_to = latest.map(|d| d.delegated_to.clone());
        // No LOB information without a record: a specific LOB query never matches.
        let lob_applicable = delegated_to.is_none() || requested_lob.is_none();
        if let Some(to) = &delegated_to {
            notes.push(format!(
                "detected delegation to {to} without a seeded record; effective dates unknown"
            ));
            if !lob_applicable {
                notes.push(format!(
                    "no seeded lines of business; not applicable to '{}'",
                    requested_lob.as_deref().unwrap_or_default()
                ));
            }
        } else {
            notes.push("no delegation registered".to_string());
        }

        DelegationStatus {
            payer_id: payer_id.to_string(),
            registered: false,
            delegated_to,
            evidence_level: evidence.level,
            evidence_basis: evidence.basis,
            effectiveness: None,
            legacy_status: latest.map(|_| match evidence.level {
                EvidenceLevel::Confirmed => crate::LegacyStatus::Confirmed,
                EvidenceLevel::Suspected => crate::LegacyStatus::Suspected,
            }),
            scope: None,
            requested_lob,
            lob_applicable,
            notes,
        }
    }

    /// Simplified view consumed by reconciliation.
    pub fn routing(
        &self,
        payer_id: &str,
        line_of_business: Option<&str>,
        today: NaiveDate,
    ) -> DelegationRouting {
        routing_from_status(&self.status(payer_id, line_of_business, today))
    }

    /// `true` when the payer has an active delegation whose scope covers
    /// `scope`.
    pub fn is_delegated(&self, payer_id: &str, scope: DelegationScope, today: NaiveDate) -> bool {
        let status = self.status(payer_id, None, today);
        let covers = status.scope.is_some_and(|s| s.covers(scope));
        covers && routing_from_status(&status).active
    }
}

/// Derive routing from a status.
///
/// - `active` = confirmed ∧ effective ∧ LOB applicable → full LBM boost.
/// - `suspected` = not active, evidence suspected or no seed record, not
///   expired, LOB applicable, and some delegate is named → tie-break boost.
/// - otherwise no boost.
pub fn routing_from_status(status: &DelegationStatus) -> DelegationRouting {
    if status.delegated_to.is_none() {
        let note = status
            .notes
            .last()
            .cloned()
            .unwrap_or_else(|| "no delegation registered".to_string());
        return DelegationRouting::none(note);
    }

    let effective = status.effectiveness == Some(Effectiveness::Effective);
    let expired = status.effectiveness == Some(Effectiveness::Expired);
    let confirmed = status.evidence_level == EvidenceLevel::Confirmed;

    let active = confirmed && effective && status.lob_applicable;
    let tentative = status.evidence_level == EvidenceLevel::Suspected || !status.registered;
    let suspected = !active && tentative && !expired
        && status.lob_applicable;

    let boost = if active {
        LbmBoost::Full
    } else if suspected {
        LbmBoost::TieBreak
    } else {
        LbmBoost::None
    };

    let to = status.delegated_to.as_deref().unwrap_or_default();
    let routing_note = if active {
        format!("lab benefits delegated to {to}; LBM guidelines take precedence over payer policy stance")
    } else if !status.lob_applicable {
        status
            .notes
            .last()
            .cloned()
            .unwrap_or_else(|| "delegation not applicable to requested line of business".to_string())
    } else if suspected && !status.registered {
        format!("delegation to {to} detected without a seeded record; LBM guidelines used as tie-breaker only")
    } else if suspected {
        format!("delegation to {to} suspected; LBM guidelines used as tie-breaker only")
    } else if expired {
        format!("delegation to {to} expired; payer policy applies")
    } else {
        format!("delegation to {to} confirmed but not yet effective")
    };

    DelegationRouting {
        active,
        suspected,
        delegated_to: status.delegated_to.clone(),
        boost_lbm: active,
        boost,
        lob_applicable: status.lob_applicable,
        routing_note,
    }
}
