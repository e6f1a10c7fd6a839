//! `hash`: one-shot change detection against a snapshot file.
//!
//! The prior snapshot is read from disk, the new one optionally written back,
//! so repeated runs over a crawl directory behave like the daemon's store.

use std::fs;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cov_hash::{
    detect_change, should_analyze, Comparison, InMemorySnapshotStore, MultiHashSnapshot,
    SnapshotStore,
};
use cov_schemas::ExtractedFields;
use serde::Serialize;

use super::{load_settings, print_json, read_json};

pub struct HashArgs {
    pub doc_id: String,
    pub content: Option<String>,
    pub extracted: Option<String>,
    pub prior: Option<String>,
    pub out: Option<String>,
    pub parser_version: Option<String>,
    pub config_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HashOutput {
    doc_id: String,
    #[serde(flatten)]
    comparison: Comparison,
    should_analyze: bool,
    snapshot: MultiHashSnapshot,
}

pub fn run(args: HashArgs) -> Result<()> {
    let doc_id = args.doc_id.trim();
    if doc_id.is_empty() {
        bail!("--doc-id must not be blank");
    }
    let settings = load_settings(&args.config_paths)?;

    let content = match &args.content {
        Some(p) => Some(fs::read_to_string(p).with_context(|| format!("read content failed: {}", p))?),
        None => None,
    };
    let extracted: Option<ExtractedFields> = match &args.extracted {
        Some(p) => Some(read_json(p)?),
        None => None,
    };

    let store = InMemorySnapshotStore::new();
    if let Some(p) = &args.prior {
        let prior: MultiHashSnapshot = read_json(p)?;
        if prior.policy_id != doc_id {
            bail!(
                "prior snapshot is for '{}', not '{}'",
                prior.policy_id,
                doc_id
            );
        }
        store.upsert(prior);
    }

    let parser_version = args
        .parser_version
        .as_deref()
        .or(settings.hash.parser_version.as_deref());
    let report = detect_change(
        &store,
        doc_id,
        content.as_deref(),
        extracted.as_ref(),
        parser_version,
        Utc::now(),
    );

    if let Some(out) = &args.out {
        let body = serde_json::to_string_pretty(&report.snapshot)?;
        fs::write(out, body).with_context(|| format!("write snapshot failed: {}", out))?;
    }

    let analyze = should_analyze(&report.comparison, settings.hash.min_priority);
    print_json(&HashOutput {
        doc_id: doc_id.to_string(),
        comparison: report.comparison,
        should_analyze: analyze,
        snapshot: report.snapshot,
    })
}
