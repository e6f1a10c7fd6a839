use chrono::{DateTime, Utc};
use cov_schemas::ExtractedFields;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::{canonical_json, canonicalize_text, sha256_hex};
use crate::section::slice_criteria_section;

/// The four independent fingerprints of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiHash {
    pub content_hash: Option<String>,
    pub metadata_hash: Option<String>,
    pub criteria_hash: Option<String>,
    pub codes_hash: Option<String>,
}

/// Latest fingerprint of a document, as persisted by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiHashSnapshot {
    pub policy_id: String,
    #[serde(flatten)]
    pub hashes: MultiHash,
    #[serde(default)]
    pub parser_version: Option<String>,
    pub computed_at: DateTime<Utc>,
}

impl MultiHashSnapshot {
    pub fn compute(
        policy_id: impl Into<String>,
        content: Option<&str>,
        extracted: Option<&ExtractedFields>,
        parser_version: Option<&str>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            policy_id: policy_id.into(),
            hashes: compute_multi_hash(content, extracted),
            parser_version: parser_version.map(str::to_string),
            computed_at,
        }
    }
}

/// Fingerprint a document.
///
/// Absent inputs produce `None` slots. The criteria slot is layered so that a
/// regression in any one source only degrades it:
///
/// 1. heading-sliced fallback from the raw text (independent of the extractor)
/// 2. the extractor's raw criteria section
/// 3. the extractor's structured criteria fields
///
/// It is `None` only when all three are empty.
pub fn compute_multi_hash(content: Option<&str>, extracted: Option<&ExtractedFields>) -> MultiHash {
    MultiHash {
        content_hash: content_hash(content),
        metadata_hash: extracted.and_then(metadata_hash),
        criteria_hash: criteria_hash(content, extracted),
        codes_hash: extracted.and_then(codes_hash),
    }
}

fn content_hash(content: Option<&str>) -> Option<String> {
    let text = canonicalize_text(content?);
    if text.is_empty() {
        return None;
    }
    Some(sha256_hex(text.as_bytes()))
}

fn metadata_hash(ex: &ExtractedFields) -> Option<String> {
    let fields = [
        ("effectiveDate", &ex.effective_date),
        ("revisionDate", &ex.revision_date),
        ("lastReviewed", &ex.last_reviewed),
        ("policyId", &ex.policy_id),
        ("policyNumber", &ex.policy_number),
        ("version", &ex.version),
    ];
    if fields.iter().all(|(_, v)| non_blank(v).is_none()) {
        return None;
    }
    let mut map = serde_json::Map::new();
    for (k, v) in fields {
        let val = non_blank(v).map_or(Value::Null, |s| Value::String(s.to_string()));
        map.insert(k.to_string(), val);
    }
    Some(sha256_hex(canonical_json(&Value::Object(map)).as_bytes()))
}

fn criteria_hash(content: Option<&str>, extracted: Option<&ExtractedFields>) -> Option<String> {
    let mut layers: Vec<String> = Vec::new();

    if let Some(section) = content.and_then(slice_criteria_section) {
        let text = canonicalize_text(&section);
        if !text.is_empty() {
            layers.push(format!("fallback:{text}"));
        }
    }

    if let Some(ex) = extracted {
        if let Some(raw) = non_blank(&ex.criteria_section) {
            layers.push(format!("raw:{}", canonicalize_text(raw)));
        }
        if let Some(structured) = structured_criteria(ex) {
            layers.push(format!("structured:{}", canonical_json(&structured)));
        }
    }

    if layers.is_empty() {
        return None;
    }
    Some(sha256_hex(layers.join("\n").as_bytes()))
}

fn structured_criteria(ex: &ExtractedFields) -> Option<Value> {
    let stance = non_blank(&ex.stance);
    let lists = [
        &ex.indications,
        &ex.limitations,
        &ex.requirements,
        &ex.exclusions,
        &ex.named_tests,
    ];
    if stance.is_none() && lists.iter().all(|l| cleaned(l).is_empty()) {
        return None;
    }
    Some(json!({
        "stance": stance,
        "indications": cleaned(&ex.indications),
        "limitations": cleaned(&ex.limitations),
        "requirements": cleaned(&ex.requirements),
        "exclusions": cleaned(&ex.exclusions),
        "namedTests": cleaned(&ex.named_tests),
    }))
}

fn codes_hash(ex: &ExtractedFields) -> Option<String> {
    let codes = &ex.codes;
    let (cpt, pla, hcpcs, icd10) = (
        sorted_codes(&codes.cpt),
        sorted_codes(&codes.pla),
        sorted_codes(&codes.hcpcs),
        sorted_codes(&codes.icd10),
    );
    if cpt.is_empty() && pla.is_empty() && hcpcs.is_empty() && icd10.is_empty() {
        return None;
    }
    let v = json!({ "cpt": cpt, "pla": pla, "hcpcs": hcpcs, "icd10": icd10 });
    Some(sha256_hex(canonical_json(&v).as_bytes()))
}

fn sorted_codes(v: &[String]) -> Vec<String> {
    let mut out: Vec<String> = cleaned(v).into_iter().map(|c| c.to_ascii_uppercase()).collect();
    out.sort();
    out.dedup();
    out
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Trimmed, blank entries dropped. Order is preserved.
fn cleaned(v: &[String]) -> Vec<String> {
    v.iter()
        .map(|s| canonicalize_text(s))
        .filter(|s| !s.is_empty())
        .collect()
}
