//! Command handler modules for cov-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod audit;
pub mod delegation;
pub mod hash;
pub mod reconcile;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use cov_config::{
    load_layered_yaml, report_unused_keys, ConfigMode, Settings, UnusedKeyPolicy,
};
use cov_delegation::{DelegationRegistry, InMemoryDelegationStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse a CLI `--mode` string into a [`ConfigMode`].
pub fn parse_config_mode(mode: &str) -> Result<ConfigMode> {
    match mode.trim().to_uppercase().as_str() {
        "SERVICE" => Ok(ConfigMode::Service),
        "BATCH" => Ok(ConfigMode::Batch),
        other => anyhow::bail!("invalid --mode '{}'. expected one of: SERVICE | BATCH", other),
    }
}

/// `--today` as a calendar date; the current UTC date when absent.
pub fn parse_today(today: Option<&str>) -> Result<NaiveDate> {
    match today {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid --today '{}'. expected YYYY-MM-DD", raw)),
        None => Ok(Utc::now().date_naive()),
    }
}

/// Read a JSON file into `T`. A UTF-8 BOM is tolerated.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read json failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    serde_json::from_slice(bytes).with_context(|| format!("invalid JSON in {}", path))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Layered settings for batch commands. No paths means defaults.
pub fn load_settings(paths: &[String]) -> Result<Settings> {
    if paths.is_empty() {
        return Ok(Settings::default());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(ConfigMode::Batch, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }
    loaded.settings()
}

/// Registry seeded from config with an empty detection store.
pub fn build_registry(settings: &Settings) -> Result<DelegationRegistry> {
    settings
        .delegation
        .build_registry(Arc::new(InMemoryDelegationStore::new()))
}

// ---------------------------------------------------------------------------
// config-check
// ---------------------------------------------------------------------------

pub fn config_check(mode: &str, fail: bool, paths: &[String]) -> Result<()> {
    let mode = parse_config_mode(mode)?;
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let policy = if fail {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = report_unused_keys(mode, &loaded.config_json, policy)?;

    println!("config_hash={}", loaded.config_hash);
    println!("mode={}", report.mode);
    if report.is_clean() {
        println!("unused_keys=0");
    } else {
        println!("unused_keys={}", report.unused_leaf_pointers.len());
        for ptr in &report.unused_leaf_pointers {
            println!("  {}", ptr);
        }
    }
    Ok(())
}
