use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cov_delegation::{DelegationRecord, DelegationRegistry, DelegationStore, EvidencePolicy};
use cov_hash::ChangePriority;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed view of the effective config. Every section and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hash: HashSettings,
    pub delegation: DelegationSettings,
    pub reconcile: ReconcileSettings,
    pub audit: AuditSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashSettings {
    /// Stamped on every snapshot; a bump explains criteria-only churn.
    pub parser_version: Option<String>,
    /// Comparisons below this priority do not trigger re-extraction.
    pub min_priority: ChangePriority,
}

impl Default for HashSettings {
    fn default() -> Self {
        Self {
            parser_version: None,
            min_priority: ChangePriority::Medium,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationSettings {
    pub decay_days: i64,
    pub detection_confidence: f64,
    /// Seed records, in the same camelCase shape the service accepts.
    pub records: Vec<DelegationRecord>,
}

impl Default for DelegationSettings {
    fn default() -> Self {
        let policy = EvidencePolicy::default();
        Self {
            decay_days: policy.decay_days,
            detection_confidence: policy.detection_confidence,
            records: Vec::new(),
        }
    }
}

impl DelegationSettings {
    pub fn evidence_policy(&self) -> EvidencePolicy {
        EvidencePolicy {
            decay_days: self.decay_days,
            detection_confidence: self.detection_confidence,
        }
    }

    /// Registry seeded from `records`, reading detections through `store`.
    pub fn build_registry(&self, store: Arc<dyn DelegationStore>) -> Result<DelegationRegistry> {
        DelegationRegistry::with_records(self.records.iter().cloned(), store, self.evidence_policy())
            .context("invalid delegation seed record")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub review_confidence_threshold: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            review_confidence_threshold: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// JSONL audit trail; no trail when absent.
    pub path: Option<String>,
    pub hash_chain: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: None,
            hash_chain: true,
        }
    }
}

impl Settings {
    pub fn from_config_json(config_json: &Value) -> Result<Settings> {
        let settings: Settings =
            serde_json::from_value(config_json.clone()).context("config does not match settings schema")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.delegation.decay_days <= 0 {
            bail!(
                "CONFIG_INVALID delegation.decay_days={} must be positive",
                self.delegation.decay_days
            );
        }
        let c = self.delegation.detection_confidence;
        if !(0.0..=1.0).contains(&c) {
            bail!("CONFIG_INVALID delegation.detection_confidence={c} must be within [0, 1]");
        }
        let t = self.reconcile.review_confidence_threshold;
        if !(0.0..=1.0).contains(&t) {
            bail!("CONFIG_INVALID reconcile.review_confidence_threshold={t} must be within [0, 1]");
        }
        Ok(())
    }
}
