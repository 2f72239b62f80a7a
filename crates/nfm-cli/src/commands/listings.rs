use anyhow::{Context, Result};
use nfm_indexer::{EventSource, GraphQlEventSource};
use nfm_reconcile::reconcile_report;

use super::load_settings;

/// `nfm listings`: one indexer fetch, reconciled, printed as JSON.
///
/// A fetch failure is an error here; there is no last-good set to fall back on.
pub async fn run(config_paths: &[String], report: bool) -> Result<()> {
    let (_, cfg) = load_settings(config_paths)?;

    let source = GraphQlEventSource::new(
        &cfg.indexer.endpoint,
        cfg.query_options(),
        cfg.request_timeout(),
    )
    .context("build indexer client")?;

    let feeds = source
        .fetch_events()
        .await
        .with_context(|| format!("indexer fetch failed: {}", cfg.indexer.endpoint))?;

    let out = reconcile_report(
        &cfg.reconcile_policy(),
        &feeds.listed,
        &feeds.sold,
        &feeds.canceled,
    );

    let json = if report {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string_pretty(&out.listings)?
    };
    println!("{json}");
    Ok(())
}
