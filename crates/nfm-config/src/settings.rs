//! Typed view of the merged config. Every section and key is optional.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use nfm_compliance::DefaultBeforeCheck;
use nfm_indexer::{QueryOptions, DEFAULT_LISTED_LIMIT};
use nfm_reconcile::{ReconcilePolicy, DEFAULT_MAX_ACTIVE};
use nfm_view::CachePolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_INDEXER_ENDPOINT: &str = "http://127.0.0.1:3000/api/graphql";
pub const DEFAULT_COMPLIANCE_ENDPOINT: &str = "http://127.0.0.1:3000/api/compliance";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_BIND: &str = "127.0.0.1:8899";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub indexer: IndexerSettings,
    pub compliance: ComplianceSettings,
    pub http: HttpSettings,
    pub reconcile: ReconcileSettings,
    pub cache: CacheSettings,
    pub daemon: DaemonSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    pub endpoint: String,
    pub listed_limit: u32,
    /// Absent: sold/canceled feeds are fetched in one unbounded request.
    pub terminal_page_size: Option<u32>,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_INDEXER_ENDPOINT.to_string(),
            listed_limit: DEFAULT_LISTED_LIMIT,
            terminal_page_size: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceSettings {
    pub endpoint: String,
    /// Name of the env var holding the oracle API key.
    pub api_key_env: Option<String>,
    pub default_before_check: DefaultBeforeCheck,
    /// Absent: only the HTTP request timeout bounds a check.
    pub check_timeout_ms: Option<u64>,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLIANCE_ENDPOINT.to_string(),
            api_key_env: None,
            default_before_check: DefaultBeforeCheck::default(),
            check_timeout_ms: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub request_timeout_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub max_active: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            max_active: DEFAULT_MAX_ACTIVE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub stale_after_ms: u64,
    pub refetch_interval_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub bind: String,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl MarketConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg = MarketConfig::deserialize(config_json)
            .context("CONFIG_INVALID: settings do not match schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values the consumers cannot run with. A zero page size fetches
    /// no sales or cancels; a zero interval or timeout never fires usefully.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("indexer.listed_limit", self.indexer.listed_limit == 0),
            ("indexer.terminal_page_size", self.indexer.terminal_page_size == Some(0)),
            ("compliance.check_timeout_ms", self.compliance.check_timeout_ms == Some(0)),
            ("http.request_timeout_ms", self.http.request_timeout_ms == 0),
            ("cache.refetch_interval_ms", self.cache.refetch_interval_ms == Some(0)),
        ];
        if let Some((key, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            bail!("CONFIG_INVALID: {key} must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.http.request_timeout_ms)
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        self.compliance.check_timeout_ms.map(Duration::from_millis)
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            listed_limit: self.indexer.listed_limit,
            terminal_page_size: self.indexer.terminal_page_size,
        }
    }

    pub fn reconcile_policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            max_active: self.reconcile.max_active,
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            stale_after: Duration::from_millis(self.cache.stale_after_ms),
            refetch_interval: self.cache.refetch_interval_ms.map(Duration::from_millis),
        }
    }
}
