use serde::{Deserialize, Serialize};

use crate::lenient::null_as_default;

/// Billing codes pulled from a policy document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCodes {
    #[serde(default, deserialize_with = "null_as_default")]
    pub cpt: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pla: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hcpcs: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icd10: Vec<String>,
}

impl BillingCodes {
    pub fn is_empty(&self) -> bool {
        self.cpt.is_empty() && self.pla.is_empty() && self.hcpcs.is_empty() && self.icd10.is_empty()
    }
}

/// Structured fields produced by the extraction pipeline for one document.
///
/// Every field is optional and untrusted. Date fields stay raw strings here:
/// they are fingerprinted as written, not interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(default)]
    pub stance: Option<String>,
    #[serde(default)]
    pub effective_date: Option<String>,
    #[serde(default)]
    pub revision_date: Option<String>,
    #[serde(default)]
    pub last_reviewed: Option<String>,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub policy_number: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Criteria text as sliced by the extractor.
    #[serde(default)]
    pub criteria_section: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub indications: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub limitations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exclusions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub named_tests: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub codes: BillingCodes,
}
