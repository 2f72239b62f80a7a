//! Shared runtime state for nfm-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The coordinator owns
//! the compliance gate and the listings query; this module only wires them
//! from config and runs the optional background refetch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use nfm_compliance::{ComplianceGate, HttpComplianceOracle};
use nfm_config::{LoadedConfig, ResolvedSecrets};
use nfm_indexer::GraphQlEventSource;
use nfm_view::{ListingsQuery, ViewCoordinator};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    /// SHA-256 of the canonical config this daemon booted with.
    pub config_hash: String,
    pub coordinator: Arc<ViewCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<ViewCoordinator>, config_hash: impl Into<String>) -> Self {
        Self {
            build: BuildInfo {
                service: "nfm-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config_hash: config_hash.into(),
            coordinator,
        }
    }

    /// Wire the HTTP indexer and compliance oracle described by `loaded`.
    pub fn from_config(loaded: &LoadedConfig, secrets: &ResolvedSecrets) -> Result<Self> {
        let cfg = loaded.settings()?;
        let timeout = cfg.request_timeout();

        let source = GraphQlEventSource::new(&cfg.indexer.endpoint, cfg.query_options(), timeout)
            .context("build indexer client")?;
        let oracle = HttpComplianceOracle::new(
            &cfg.compliance.endpoint,
            secrets.compliance_api_key.clone(),
            timeout,
        )
        .context("build compliance client")?;

        let mut gate = ComplianceGate::new(Arc::new(oracle), cfg.compliance.default_before_check);
        if let Some(limit) = cfg.check_timeout() {
            gate = gate.with_check_timeout(limit);
        }
        let listings = ListingsQuery::new(Arc::new(source), cfg.reconcile_policy(), cfg.cache_policy());

        info!(
            indexer = %cfg.indexer.endpoint,
            compliance = %cfg.compliance.endpoint,
            default_before_check = ?cfg.compliance.default_before_check,
            stale_after_ms = cfg.cache.stale_after_ms,
            config_hash = %loaded.config_hash,
            "daemon state wired"
        );

        Ok(Self::new(
            Arc::new(ViewCoordinator::new(Arc::new(gate), Arc::new(listings))),
            loaded.config_hash.clone(),
        ))
    }
}

/// Spawn a background task that force-refetches listings every `interval`.
///
/// Failures are logged and retried on the next tick; the last good listings
/// stay in the cache meanwhile.
pub fn spawn_refetch_loop(state: Arc<AppState>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let view = state.coordinator.listings().refetch().await;
            match &view.error {
                None => debug!(listings = view.listings.len(), "interval refetch ok"),
                Some(err) => warn!(kind = err.kind(), %err, "interval refetch failed"),
            }
        }
    })
}
