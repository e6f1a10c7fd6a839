use anyhow::Result;
use cov_delegation::{routing_from_status, DelegationRouting, DelegationStatus};
use serde::Serialize;

use super::{build_registry, load_settings, parse_today, print_json};

#[derive(Debug, Serialize)]
struct DelegationReport {
    status: DelegationStatus,
    routing: DelegationRouting,
}

/// Status and routing for one payer from the configured seed records.
pub fn run(
    payer_id: &str,
    lob: Option<&str>,
    config_paths: &[String],
    today: Option<&str>,
) -> Result<()> {
    let settings = load_settings(config_paths)?;
    let registry = build_registry(&settings)?;
    let today = parse_today(today)?;

    let status = registry.status(payer_id.trim(), lob, today);
    let routing = routing_from_status(&status);
    print_json(&DelegationReport { status, routing })
}
