//! Axum router and all HTTP handlers for cov-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers so tests can drive the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use cov_audit::{TOPIC_DELEGATION, TOPIC_HASH, TOPIC_RECONCILE};
use cov_delegation::DelegationDetection;
use cov_hash::{detect_change, should_analyze};
use cov_reconcile::{reconcile_with_registry, summarize, ReconciliationResult};
use cov_schemas::CoverageAssertion;
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        DetectionAccepted, ErrorResponse, HashCompareRequest, HashCompareResponse, HealthResponse,
        LobQuery, ReconcileRequest, SummaryRequest, UpsertAssertionsRequest,
        UpsertAssertionsResponse, UpsertedAssertion,
    },
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/stream", get(stream))
        .route("/v1/reconcile", post(reconcile_handler))
        .route("/v1/assertions", post(upsert_assertions))
        .route("/v1/hash-compare", post(hash_compare))
        .route("/v1/delegation/:payer_id", get(delegation_routing))
        .route("/v1/delegation/:payer_id/status", get(delegation_status))
        .route("/v1/delegation/:payer_id/detections", post(record_detection))
        .route("/v1/summary", post(summary_handler))
        .with_state(state)
}

fn bad_request(code: &str, error: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

fn non_blank(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

/// Blank ids inherit the request's pair.
fn belongs_to_pair(a: &CoverageAssertion, payer_id: &str, test_id: &str) -> bool {
    non_blank(&a.payer_id).map_or(true, |p| p == payer_id)
        && non_blank(&a.test_id).map_or(true, |t| t == test_id)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            config_hash: st.config_hash.clone(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/reconcile
// ---------------------------------------------------------------------------

pub(crate) async fn reconcile_handler(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    let (Some(payer_id), Some(test_id)) = (non_blank(&req.payer_id), non_blank(&req.test_id))
    else {
        return bad_request("MISSING_FIELD", "payerId and testId are required");
    };

    let assertions = match req.assertions {
        Some(a) => {
            if let Some(stray) = a.iter().find(|x| !belongs_to_pair(x, payer_id, test_id)) {
                return bad_request(
                    "MISMATCHED_PAIR",
                    format!(
                        "assertion {:?} names {}/{}, request is for {payer_id}/{test_id}",
                        stray.assertion_id, stray.payer_id, stray.test_id
                    ),
                );
            }
            a
        }
        None => st.book.read().await.for_pair(payer_id, test_id),
    };

    let result = reconcile_with_registry(
        &st.registry,
        payer_id,
        test_id,
        req.line_of_business.as_deref(),
        &assertions,
        st.today(),
    );

    info!(
        payer_id,
        test_id,
        status = %result.status,
        confidence = result.confidence,
        "reconcile"
    );
    audit_escalation(&st, &result).await;

    (StatusCode::OK, Json(result)).into_response()
}

async fn audit_escalation(st: &AppState, result: &ReconciliationResult) {
    if !result.needs_review() {
        return;
    }
    st.audit(
        &format!("{}/{}", result.payer_id, result.test_id),
        TOPIC_RECONCILE,
        "CONFLICT_ESCALATED",
        json!({
            "confidence": result.confidence,
            "conflicts": result.conflicts,
            "delegation": result.delegation,
        }),
    )
    .await;
}

// ---------------------------------------------------------------------------
// POST /v1/assertions
// ---------------------------------------------------------------------------

pub(crate) async fn upsert_assertions(
    State(st): State<Arc<AppState>>,
    Json(req): Json<UpsertAssertionsRequest>,
) -> Response {
    if let Some(bad) = req
        .assertions
        .iter()
        .position(|a| non_blank(&a.payer_id).is_none() || non_blank(&a.test_id).is_none())
    {
        return bad_request(
            "MISSING_FIELD",
            format!("assertions[{bad}]: payerId and testId are required"),
        );
    }

    let mut book = st.book.write().await;
    let results: Vec<UpsertedAssertion> = req
        .assertions
        .into_iter()
        .map(|a| UpsertedAssertion {
            key: a.key(),
            outcome: book.upsert(a),
        })
        .collect();
    let book_size = book.len();
    drop(book);

    info!(upserted = results.len(), book_size, "assertions upserted");
    (StatusCode::OK, Json(UpsertAssertionsResponse { results, book_size })).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/hash-compare
// ---------------------------------------------------------------------------

pub(crate) async fn hash_compare(
    State(st): State<Arc<AppState>>,
    Json(req): Json<HashCompareRequest>,
) -> Response {
    let Some(doc_id) = non_blank(&req.doc_id) else {
        return bad_request("MISSING_FIELD", "docId is required");
    };

    let parser_version = req
        .parser_version
        .as_deref()
        .or(st.settings.hash.parser_version.as_deref());

    let report = {
        let _guard = st.hash_lock.lock().await;
        detect_change(
            st.snapshots.as_ref(),
            doc_id,
            req.content.as_deref(),
            req.extracted.as_ref(),
            parser_version,
            st.now(),
        )
    };
    let analyze = should_analyze(&report.comparison, st.settings.hash.min_priority);

    if report.comparison.changed {
        let event_type = if report.comparison.possible_system_change {
            "POSSIBLE_SYSTEM_CHANGE"
        } else {
            "DOCUMENT_CHANGED"
        };
        st.audit(
            doc_id,
            TOPIC_HASH,
            event_type,
            json!({
                "priority": report.comparison.priority,
                "changedHashes": report.comparison.changed_hashes,
                "notes": report.comparison.notes,
                "parserVersion": report.snapshot.parser_version,
                "shouldAnalyze": analyze,
            }),
        )
        .await;
    }

    (
        StatusCode::OK,
        Json(HashCompareResponse {
            doc_id: doc_id.to_string(),
            comparison: report.comparison,
            should_analyze: analyze,
            snapshot: report.snapshot,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// /v1/delegation/:payer_id
// ---------------------------------------------------------------------------

pub(crate) async fn delegation_routing(
    State(st): State<Arc<AppState>>,
    Path(payer_id): Path<String>,
    Query(q): Query<LobQuery>,
) -> impl IntoResponse {
    let routing = st.registry.routing(&payer_id, q.lob.as_deref(), st.today());
    (StatusCode::OK, Json(routing))
}

pub(crate) async fn delegation_status(
    State(st): State<Arc<AppState>>,
    Path(payer_id): Path<String>,
    Query(q): Query<LobQuery>,
) -> impl IntoResponse {
    let status = st.registry.status(&payer_id, q.lob.as_deref(), st.today());
    (StatusCode::OK, Json(status))
}

pub(crate) async fn record_detection(
    State(st): State<Arc<AppState>>,
    Path(payer_id): Path<String>,
    Json(detection): Json<DelegationDetection>,
) -> Response {
    if non_blank(&detection.delegated_to).is_none() {
        return bad_request("MISSING_FIELD", "delegatedTo is required");
    }

    let payload = json!({
        "delegatedTo": detection.delegated_to,
        "confidence": detection.confidence,
        "detectedAt": detection.detected_at,
        "sourceUrl": detection.source_url,
    });
    st.registry.record_detection(&payer_id, detection);
    st.audit(&payer_id, TOPIC_DELEGATION, "DETECTION_RECORDED", payload)
        .await;

    let detections = st.registry.detections(&payer_id).len();
    let routing = st.registry.routing(&payer_id, None, st.today());
    info!(payer_id = %payer_id, detections, active = routing.active, "delegation detection recorded");

    (
        StatusCode::OK,
        Json(DetectionAccepted {
            payer_id,
            detections,
            routing,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/summary
// ---------------------------------------------------------------------------

pub(crate) async fn summary_handler(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SummaryRequest>,
) -> Response {
    let today = st.today();
    let mut results = req.results;

    if !req.pairs.is_empty() || results.is_empty() {
        let book = st.book.read().await;
        let pairs: Vec<(String, String, Option<String>)> = if req.pairs.is_empty() {
            book.pairs().into_iter().map(|(p, t)| (p, t, None)).collect()
        } else {
            req.pairs
                .into_iter()
                .map(|p| (p.payer_id, p.test_id, p.line_of_business))
                .collect()
        };
        for (payer_id, test_id, lob) in pairs {
            let assertions = book.for_pair(&payer_id, &test_id);
            results.push(reconcile_with_registry(
                &st.registry,
                &payer_id,
                &test_id,
                lob.as_deref(),
                &assertions,
                today,
            ));
        }
    }

    let summary = summarize(&results, st.settings.reconcile.review_confidence_threshold);
    info!(
        total = summary.total,
        review = summary.review.len(),
        average_confidence = summary.average_confidence,
        "summary"
    );
    (StatusCode::OK, Json(summary)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        let m = msg.ok()?; // lagged / closed
        let event_name = match &m {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::LogLine { .. } => "log",
        };
        let data = serde_json::to_string(&m).ok()?;
        Some(Ok(Event::default().event(event_name).data(data)))
    })
}
