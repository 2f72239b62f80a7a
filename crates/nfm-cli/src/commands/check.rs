use std::sync::Arc;

use anyhow::{bail, Context, Result};
use nfm_compliance::{ComplianceGate, HttpComplianceOracle};
use nfm_config::resolve_secrets;
use nfm_schemas::ComplianceStatus;

use super::load_settings;

/// `nfm check`: run one check through the gate and print the committed status.
pub async fn run(config_paths: &[String], address: &str) -> Result<()> {
    let address = address.trim();
    if address.is_empty() {
        bail!("--address must not be empty");
    }

    let (_, cfg) = load_settings(config_paths)?;
    let secrets = resolve_secrets(&cfg)?;

    let oracle = HttpComplianceOracle::new(
        &cfg.compliance.endpoint,
        secrets.compliance_api_key,
        cfg.request_timeout(),
    )
    .context("build compliance client")?;

    let mut gate = ComplianceGate::new(Arc::new(oracle), cfg.compliance.default_before_check);
    if let Some(limit) = cfg.check_timeout() {
        gate = gate.with_check_timeout(limit);
    }
    let gate = Arc::new(gate);

    let status = match gate.set_address(Some(address)) {
        Some(check) => check.await.context("compliance check task failed")?,
        None => None,
    };

    let status = status.unwrap_or(ComplianceStatus::Unknown);
    println!("address={address}");
    println!("status={status}");
    if let Some(reason) = gate.last_denial() {
        println!("denial={}", serde_json::to_string(&reason)?);
    }
    Ok(())
}
