//! Request and response types for all cov-daemon HTTP endpoints.
//!
//! Wire names are camelCase, matching the schema crate. No business logic
//! lives here.

use cov_delegation::DelegationRouting;
use cov_hash::{Comparison, MultiHashSnapshot};
use cov_reconcile::ReconciliationResult;
use cov_schemas::{AssertionKey, CoverageAssertion, ExtractedFields, UpsertOutcome};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors (400)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable code, e.g. "MISSING_FIELD".
    pub code: String,
}

// ---------------------------------------------------------------------------
// /v1/reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    #[serde(default)]
    pub payer_id: String,
    #[serde(default)]
    pub test_id: String,
    #[serde(default)]
    pub line_of_business: Option<String>,
    /// When absent, the assertions held in the book for the pair are used.
    #[serde(default)]
    pub assertions: Option<Vec<CoverageAssertion>>,
}

// ---------------------------------------------------------------------------
// /v1/assertions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAssertionsRequest {
    pub assertions: Vec<CoverageAssertion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertedAssertion {
    pub key: AssertionKey,
    #[serde(flatten)]
    pub outcome: UpsertOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAssertionsResponse {
    pub results: Vec<UpsertedAssertion>,
    /// Assertions held in the book after this call.
    pub book_size: usize,
}

// ---------------------------------------------------------------------------
// /v1/hash-compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashCompareRequest {
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub extracted: Option<ExtractedFields>,
    /// Overrides `hash.parser_version` from config.
    #[serde(default)]
    pub parser_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashCompareResponse {
    pub doc_id: String,
    #[serde(flatten)]
    pub comparison: Comparison,
    /// Whether the priority meets the configured minimum for re-extraction.
    pub should_analyze: bool,
    pub snapshot: MultiHashSnapshot,
}

// ---------------------------------------------------------------------------
// /v1/delegation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LobQuery {
    pub lob: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionAccepted {
    pub payer_id: String,
    /// Detections now on file for the payer.
    pub detections: usize,
    /// Routing after the detection, with no LOB filter.
    pub routing: DelegationRouting,
}

// ---------------------------------------------------------------------------
// /v1/summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRef {
    pub payer_id: String,
    pub test_id: String,
    #[serde(default)]
    pub line_of_business: Option<String>,
}

/// Precomputed `results`, explicit `pairs` reconciled from the book, or
/// neither to summarize every pair in the book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub results: Vec<ReconciliationResult>,
    #[serde(default)]
    pub pairs: Vec<PairRef>,
}
