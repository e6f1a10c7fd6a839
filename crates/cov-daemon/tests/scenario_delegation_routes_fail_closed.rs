//! Delegation endpoints over a registry seeded from config.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use cov_config::load_layered_yaml_from_strings;
use cov_daemon::{routes, state};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const CONFIG: &str = r#"
delegation:
  records:
    - payerId: bcbs-nc
      delegatesTo: Carelon
      evidenceLevel: confirmed
      linesOfBusiness: [commercial]
      lastVerified: "2025-08-15"
    - payerId: uhc
      delegatesTo: Optum Lab Benefit Mgmt
      linesOfBusiness: [all]
"#;

fn make_state() -> Arc<state::AppState> {
    let loaded = load_layered_yaml_from_strings(&[CONFIG]).unwrap();
    let st = state::AppState::from_loaded(&loaded)
        .unwrap()
        .with_clock(Arc::new(|| Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()));
    Arc::new(st)
}

async fn send(st: &Arc<state::AppState>, req: Request<axum::body::Body>) -> (StatusCode, Value) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).expect("body is not valid JSON"))
}

async fn get(st: &Arc<state::AppState>, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    send(st, req).await
}

async fn post(st: &Arc<state::AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    send(st, req).await
}

#[tokio::test]
async fn health_reports_config_hash() {
    let st = make_state();
    let (_, json) = get(&st, "/v1/health").await;
    assert_eq!(json["configHash"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn other_lob_is_not_applicable() {
    let st = make_state();

    let (status, json) = get(&st, "/v1/delegation/bcbs-nc?lob=medicare_advantage").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], false);
    assert_eq!(json["lobApplicable"], false);
    assert_eq!(json["boost"], "none");

    let (_, json) = get(&st, "/v1/delegation/bcbs-nc?lob=commercial").await;
    assert_eq!(json["active"], true);
    assert_eq!(json["boostLBM"], true);
    assert_eq!(json["delegatedTo"], "Carelon");
}

#[tokio::test]
async fn reconcile_weights_follow_the_lob() {
    let st = make_state();
    let assertions = json!([
        {"assertionId": "pol", "payerId": "bcbs-nc", "testId": "signatera",
         "layer": "policy_stance", "status": "restricts", "confidence": 0.9},
        {"assertionId": "lbm", "payerId": "bcbs-nc", "testId": "signatera",
         "layer": "lbm_guideline", "status": "supports", "confidence": 0.6}
    ]);

    let (_, json) = post(
        &st,
        "/v1/reconcile",
        json!({"payerId": "bcbs-nc", "testId": "signatera",
               "lineOfBusiness": "medicare_advantage", "assertions": assertions}),
    )
    .await;
    assert_eq!(json["weights"]["lbm_guideline"], 0.95);
    assert_eq!(json["weights"]["policy_stance"], 0.7);
    assert_eq!(json["delegation"]["lobApplicable"], false);

    let (_, json) = post(
        &st,
        "/v1/reconcile",
        json!({"payerId": "bcbs-nc", "testId": "signatera",
               "lineOfBusiness": "commercial", "assertions": assertions}),
    )
    .await;
    assert_eq!(json["weights"]["lbm_guideline"], 1.0);
    assert_eq!(json["weights"]["policy_stance"], 0.4);
    assert_eq!(json["supporting"].as_array().unwrap().len(), 1);
    assert_eq!(json["supporting"][0]["assertionId"], "pol");
}

#[tokio::test]
async fn detection_upgrades_suspected_payer() {
    let st = make_state();

    let (_, json) = get(&st, "/v1/delegation/uhc").await;
    assert_eq!(json["active"], false);
    assert_eq!(json["suspected"], true);
    assert_eq!(json["boost"], "tie_break");

    let (status, json) = post(
        &st,
        "/v1/delegation/uhc/detections",
        json!({
            "delegatedTo": "Optum Lab Benefit Mgmt",
            "confidence": 0.93,
            "detectedAt": "2025-08-25T10:00:00Z",
            "evidence": "lab benefits administered by Optum effective 1/1",
            "sourceUrl": "https://uhc.example/bulletin"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["detections"], 1);
    assert_eq!(json["routing"]["active"], true);

    let (_, json) = get(&st, "/v1/delegation/uhc/status").await;
    assert_eq!(json["evidenceLevel"], "confirmed");
    assert_eq!(json["evidenceBasis"], "high_confidence_detection");
    assert_eq!(json["legacyStatus"], "active");
}

#[tokio::test]
async fn detection_requires_delegate_name() {
    let st = make_state();
    let (status, json) = post(
        &st,
        "/v1/delegation/uhc/detections",
        json!({"delegatedTo": " ", "confidence": 0.9, "detectedAt": "2025-08-25T10:00:00Z"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "MISSING_FIELD");
}
