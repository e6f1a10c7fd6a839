use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::lenient::{
    lenient_date, lenient_f64, lenient_opt_string, lenient_string, render_value,
    sanitize_confidence,
};

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// Authority tier of a coverage assertion.
///
/// Recognized tiers, highest authority first: operational UM criteria, LBM
/// guideline, payer medical policy, overlay/state mandate, vendor claim.
/// Anything else is kept verbatim in [`Layer::Unknown`] and carries no weight.
/// Non-string wire values render into `Unknown` rather than failing.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub enum Layer {
    UmCriteria,
    LbmGuideline,
    PolicyStance,
    Overlay,
    VendorClaim,
    Unknown(String),
}

impl Layer {
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "um_criteria" => Layer::UmCriteria,
            "lbm_guideline" => Layer::LbmGuideline,
            "policy_stance" => Layer::PolicyStance,
            "overlay" => Layer::Overlay,
            "vendor_claim" => Layer::VendorClaim,
            _ => Layer::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Layer::UmCriteria => "um_criteria",
            Layer::LbmGuideline => "lbm_guideline",
            Layer::PolicyStance => "policy_stance",
            Layer::Overlay => "overlay",
            Layer::VendorClaim => "vendor_claim",
            Layer::Unknown(s) => s.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Layer::Unknown(_))
    }
}

impl Default for Layer {
    fn default() -> Self {
        Layer::Unknown(String::new())
    }
}

impl From<String> for Layer {
    fn from(s: String) -> Self {
        Layer::parse(&s)
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Layer::parse(&s),
            Some(other) => render_value(&other).map(Layer::Unknown).unwrap_or_default(),
            None => Layer::default(),
        })
    }
}

impl From<Layer> for String {
    fn from(l: Layer) -> Self {
        l.as_str().to_string()
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssertionStatus
// ---------------------------------------------------------------------------

/// What one source document says about coverage of a test.
/// A non-string wire value reads as `Unclear`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub enum AssertionStatus {
    Supports,
    Restricts,
    Denies,
    Unclear,
    Unknown(String),
}

impl AssertionStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "supports" => AssertionStatus::Supports,
            "restricts" => AssertionStatus::Restricts,
            "denies" => AssertionStatus::Denies,
            "unclear" | "" => AssertionStatus::Unclear,
            _ => AssertionStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssertionStatus::Supports => "supports",
            AssertionStatus::Restricts => "restricts",
            AssertionStatus::Denies => "denies",
            AssertionStatus::Unclear => "unclear",
            AssertionStatus::Unknown(s) => s.as_str(),
        }
    }

    /// `Unclear` and unrecognized statuses both say nothing definite.
    pub fn is_definite(&self) -> bool {
        matches!(
            self,
            AssertionStatus::Supports | AssertionStatus::Restricts | AssertionStatus::Denies
        )
    }
}

impl Default for AssertionStatus {
    fn default() -> Self {
        AssertionStatus::Unclear
    }
}

impl From<String> for AssertionStatus {
    fn from(s: String) -> Self {
        AssertionStatus::parse(&s)
    }
}

impl<'de> Deserialize<'de> for AssertionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => AssertionStatus::parse(&s),
            _ => AssertionStatus::Unclear,
        })
    }
}

impl From<AssertionStatus> for String {
    fn from(s: AssertionStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for AssertionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

// ---------------------------------------------------------------------------
// CoverageAssertion
// ---------------------------------------------------------------------------

/// One source document's claim about whether a payer covers a specific test.
///
/// Upserted by the crawler after extraction, keyed by
/// `(payer_id, test_id, layer, source_url)`; see [`AssertionKey`].
///
/// Every field decodes leniently: a wrong-typed value degrades that field to
/// its default instead of rejecting the whole assertion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageAssertion {
    #[serde(default, deserialize_with = "lenient_string")]
    pub assertion_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payer_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub test_id: String,
    #[serde(default)]
    pub layer: Layer,
    #[serde(default)]
    pub status: AssertionStatus,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub source_quote: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub criteria: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub effective_date: Option<NaiveDate>,
}

impl CoverageAssertion {
    pub fn new(
        assertion_id: impl Into<String>,
        payer_id: impl Into<String>,
        test_id: impl Into<String>,
        layer: Layer,
        status: AssertionStatus,
        confidence: f64,
    ) -> Self {
        Self {
            assertion_id: assertion_id.into(),
            payer_id: payer_id.into(),
            test_id: test_id.into(),
            layer,
            status,
            confidence,
            source_url: None,
            source_quote: None,
            criteria: None,
            effective_date: None,
        }
    }

    pub fn with_source(mut self, url: impl Into<String>, quote: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self.source_quote = Some(quote.into());
        self
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }

    pub fn with_effective_date(mut self, date: NaiveDate) -> Self {
        self.effective_date = Some(date);
        self
    }

    /// Confidence clamped into `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        sanitize_confidence(self.confidence)
    }

    pub fn key(&self) -> AssertionKey {
        AssertionKey {
            payer_id: self.payer_id.clone(),
            test_id: self.test_id.clone(),
            layer: self.layer.as_str().to_string(),
            source_url: self.source_url.clone().unwrap_or_default(),
        }
    }
}

/// Identity of an assertion across re-extractions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionKey {
    pub payer_id: String,
    pub test_id: String,
    pub layer: String,
    pub source_url: String,
}
