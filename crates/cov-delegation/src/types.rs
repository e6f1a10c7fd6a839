use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// LOB token that makes a record apply to every line of business.
pub const ALL_LINES_OF_BUSINESS: &str = "all";

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

/// Evidence axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceLevel {
    #[default]
    Suspected,
    Confirmed,
}

/// Temporal axis. Never stored; always derived from dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effectiveness {
    Pending,
    Effective,
    Expired,
}

/// Single-enum view over both axes, kept for consumers that predate the split.
/// Computed on read by [`crate::legacy_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyStatus {
    Active,
    Expired,
    Confirmed,
    Suspected,
}

/// Why the evidence axis resolved the way it did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceBasis {
    ManualVerification,
    HighConfidenceDetection,
    CorroboratedDetections,
    /// Seeded as confirmed but not re-verified inside the decay window.
    Decayed,
    Unverified,
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// What the delegation covers. Broader scopes contain narrower ones:
/// `lab_benefits ⊇ molecular_testing ⊇ molecular_genomic_testing ⊇ genetic_testing`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationScope {
    #[default]
    LabBenefits,
    MolecularTesting,
    MolecularGenomicTesting,
    GeneticTesting,
}

impl DelegationScope {
    fn breadth_rank(self) -> u8 {
        match self {
            DelegationScope::LabBenefits => 0,
            DelegationScope::MolecularTesting => 1,
            DelegationScope::MolecularGenomicTesting => 2,
            DelegationScope::GeneticTesting => 3,
        }
    }

    /// `true` when a delegation of scope `self` also covers `query`.
    pub fn covers(self, query: DelegationScope) -> bool {
        self.breadth_rank() <= query.breadth_rank()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_lob(s).as_str() {
            "lab_benefits" => Some(DelegationScope::LabBenefits),
            "molecular_testing" => Some(DelegationScope::MolecularTesting),
            "molecular_genomic_testing" => Some(DelegationScope::MolecularGenomicTesting),
            "genetic_testing" => Some(DelegationScope::GeneticTesting),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record + detection
// ---------------------------------------------------------------------------

/// Manually seeded delegation fact for one payer.
///
/// No effectiveness or composite status is stored: both
/// are projections computed from these fields on every read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRecord {
    pub payer_id: String,
    pub delegates_to: String,
    #[serde(default)]
    pub evidence_level: EvidenceLevel,
    #[serde(default)]
    pub scope: DelegationScope,
    /// Normalized LOB tokens; may contain [`ALL_LINES_OF_BUSINESS`].
    /// An empty set matches no specific LOB.
    #[serde(default)]
    pub lines_of_business: BTreeSet<String>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub effective_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub last_verified: Option<NaiveDate>,
}

impl DelegationRecord {
    pub fn new(payer_id: impl Into<String>, delegates_to: impl Into<String>) -> Self {
        Self {
            payer_id: payer_id.into(),
            delegates_to: delegates_to.into(),
            evidence_level: EvidenceLevel::Suspected,
            scope: DelegationScope::LabBenefits,
            lines_of_business: BTreeSet::new(),
            effective_date: None,
            effective_end_date: None,
            evidence: Vec::new(),
            last_verified: None,
        }
    }

    pub fn confirmed(mut self, verified_on: NaiveDate) -> Self {
        self.evidence_level = EvidenceLevel::Confirmed;
        self.last_verified = Some(verified_on);
        self
    }

    pub fn with_lines_of_business<I, S>(mut self, lobs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.lines_of_business = lobs.into_iter().map(|l| normalize_lob(l.as_ref())).collect();
        self
    }

    pub fn with_scope(mut self, scope: DelegationScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn effective_between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.effective_date = start;
        self.effective_end_date = end;
        self
    }

    /// Reject seeds that cannot be reasoned about.
    pub fn validate(&self) -> Result<(), InvalidDelegationRecord> {
        if self.payer_id.trim().is_empty() {
            return Err(InvalidDelegationRecord::new(&self.payer_id, "payerId is empty"));
        }
        if self.delegates_to.trim().is_empty() {
            return Err(InvalidDelegationRecord::new(&self.payer_id, "delegatesTo is empty"));
        }
        if let (Some(start), Some(end)) = (self.effective_date, self.effective_end_date) {
            if end < start {
                return Err(InvalidDelegationRecord::new(
                    &self.payer_id,
                    format!("effectiveEndDate {end} precedes effectiveDate {start}"),
                ));
            }
        }
        Ok(())
    }

    /// LOB applicability. Fails closed: no match means the record does not apply.
    pub fn applies_to_lob(&self, lob: &str) -> bool {
        let want = normalize_lob(lob);
        self.lines_of_business.iter().any(|l| {
            let have = normalize_lob(l);
            have == ALL_LINES_OF_BUSINESS || have == want
        })
    }
}

/// Crawler-detected sign that a payer delegates to an LBM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationDetection {
    pub delegated_to: String,
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Seed record rejected by [`DelegationRecord::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidDelegationRecord {
    pub payer_id: String,
    pub reason: String,
}

impl InvalidDelegationRecord {
    fn new(payer_id: &str, reason: impl Into<String>) -> Self {
        Self {
            payer_id: payer_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for InvalidDelegationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid delegation record for payer '{}': {}",
            self.payer_id, self.reason
        )
    }
}

impl std::error::Error for InvalidDelegationRecord {}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// Full diagnostic view of one payer's delegation for one query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationStatus {
    pub payer_id: String,
    /// A seeded record exists (detections alone never make a payer registered).
    pub registered: bool,
    pub delegated_to: Option<String>,
    pub evidence_level: EvidenceLevel,
    pub evidence_basis: EvidenceBasis,
    pub effectiveness: Option<Effectiveness>,
    pub legacy_status: Option<LegacyStatus>,
    pub scope: Option<DelegationScope>,
    pub requested_lob: Option<String>,
    pub lob_applicable: bool,
    pub notes: Vec<String>,
}

/// How strongly LBM guidelines are lifted for a query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LbmBoost {
    #[default]
    None,
    /// Suspected delegation: enough to break ties, never enough to outrank
    /// operational UM criteria.
    TieBreak,
    /// Active delegation: LBM guideline joins the top tier and payer policy
    /// stance is demoted (never removed).
    Full,
}

/// Routing decision consumed by reconciliation. Derived per query, never
/// persisted.
///
/// `boost` (how much more authoritative LBM sources become) and
/// `lob_applicable` (whether delegation applies to this query at all) are
/// independent fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRouting {
    pub active: bool,
    pub suspected: bool,
    pub delegated_to: Option<String>,
    #[serde(rename = "boostLBM")]
    pub boost_lbm: bool,
    pub boost: LbmBoost,
    pub lob_applicable: bool,
    pub routing_note: String,
}

impl DelegationRouting {
    /// Routing for a payer with no delegation on file.
    pub fn none(note: impl Into<String>) -> Self {
        Self {
            active: false,
            suspected: false,
            delegated_to: None,
            boost_lbm: false,
            boost: LbmBoost::None,
            lob_applicable: true,
            routing_note: note.into(),
        }
    }
}

/// Normalize a LOB token: `"Medicare Advantage"` → `"medicare_advantage"`.
pub fn normalize_lob(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}
