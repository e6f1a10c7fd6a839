//! `reconcile` and `summary`: batch reconciliation over JSON inputs.

use anyhow::{bail, Result};
use cov_reconcile::{
    check_publish_gate, reconcile_with_registry, summarize, PublishGate, ReconciliationResult,
};
use cov_schemas::CoverageAssertion;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{build_registry, load_settings, parse_today, print_json, read_json};

/// One (payer, test) and every assertion collected for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileInput {
    #[serde(default)]
    pub payer_id: String,
    #[serde(default)]
    pub test_id: String,
    #[serde(default)]
    pub line_of_business: Option<String>,
    #[serde(default)]
    pub assertions: Vec<CoverageAssertion>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileOutput {
    #[serde(flatten)]
    result: ReconciliationResult,
    publishable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    hold_reason: Option<String>,
}

fn validate(input: &ReconcileInput, idx: Option<usize>) -> Result<()> {
    if input.payer_id.trim().is_empty() || input.test_id.trim().is_empty() {
        match idx {
            Some(i) => bail!("input[{}]: payerId and testId are required", i),
            None => bail!("payerId and testId are required"),
        }
    }
    Ok(())
}

pub fn run_one(
    input_path: &str,
    lob: Option<String>,
    config_paths: &[String],
    today: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_paths)?;
    let registry = build_registry(&settings)?;
    let today = parse_today(today)?;

    let input: ReconcileInput = read_json(input_path)?;
    validate(&input, None)?;
    let lob = lob.or(input.line_of_business);

    let result = reconcile_with_registry(
        &registry,
        input.payer_id.trim(),
        input.test_id.trim(),
        lob.as_deref(),
        &input.assertions,
        today,
    );

    let gate = check_publish_gate(&result, settings.reconcile.review_confidence_threshold);
    let hold_reason = match gate {
        PublishGate::Publish => None,
        PublishGate::HoldForReview { reason } => Some(reason),
    };
    info!(status = %result.status, confidence = result.confidence, "reconciled");

    print_json(&ReconcileOutput {
        publishable: hold_reason.is_none(),
        hold_reason,
        result,
    })
}

pub fn run_summary(input_path: &str, config_paths: &[String], today: Option<&str>) -> Result<()> {
    let settings = load_settings(config_paths)?;
    let registry = build_registry(&settings)?;
    let today = parse_today(today)?;

    let inputs: Vec<ReconcileInput> = read_json(input_path)?;
    for (i, input) in inputs.iter().enumerate() {
        validate(input, Some(i))?;
    }

    let results: Vec<ReconciliationResult> = inputs
        .iter()
        .map(|input| {
            reconcile_with_registry(
                &registry,
                input.payer_id.trim(),
                input.test_id.trim(),
                input.line_of_business.as_deref(),
                &input.assertions,
                today,
            )
        })
        .collect();

    let summary = summarize(&results, settings.reconcile.review_confidence_threshold);
    info!(total = summary.total, review = summary.review.len(), "summarized");
    print_json(&summary)
}
