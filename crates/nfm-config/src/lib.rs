//! nfm-config
//!
//! Layered YAML configuration for the marketplace hosts.
//!
//! - Documents merge in order; later documents override earlier ones.
//! - The merged document is canonicalised (sorted keys) and hashed with
//!   SHA-256 so a running host can report exactly which config it loaded.
//! - Literal secrets are refused; YAML names the env var, never the value.

mod consumption;
mod secrets;
mod settings;

pub use consumption::{consumed_pointers, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport};
pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use settings::{
    CacheSettings, ComplianceSettings, DaemonSettings, HttpSettings, IndexerSettings,
    MarketConfig, ReconcileSettings, DEFAULT_BIND, DEFAULT_COMPLIANCE_ENDPOINT,
    DEFAULT_INDEXER_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_MS,
};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;

/// Leaf strings starting with one of these abort the load with
/// `CONFIG_SECRET_DETECTED`.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "Bearer ",
];

/// Merged config plus its identity.
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    /// SHA-256 of `canonical_json`, lowercase hex.
    pub config_hash: String,
    /// Compact JSON with keys in sorted order.
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed settings with defaults filled in for absent keys.
    pub fn settings(&self) -> Result<MarketConfig> {
        MarketConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("read config layer {p}")))
        .collect::<Result<Vec<String>>>()?;

    let layers: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&layers)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (layer, raw) in yaml_docs.iter().enumerate() {
        let doc: serde_yaml::Value = serde_yaml::from_str(raw)
            .with_context(|| format!("config layer {layer} is not valid yaml"))?;
        // An empty document parses as null.
        if doc.is_null() {
            continue;
        }
        let doc = serde_json::to_value(doc)
            .with_context(|| format!("config layer {layer} has no json form"))?;
        overlay(&mut merged, doc);
    }

    reject_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("serialize merged config")?;
    Ok(LoadedConfig {
        config_hash: hex::encode(Sha256::digest(canonical_json.as_bytes())),
        canonical_json,
        config_json: merged,
    })
}

/// Objects merge key by key; any other value in `top` replaces `base`.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base_map), Value::Object(top_map)) => {
            for (key, value) in top_map {
                overlay(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn reject_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    consumption::collect_leaf_pointers(v, "", &mut leaves);

    let hit = leaves.into_iter().find(|ptr| {
        v.pointer(ptr)
            .and_then(Value::as_str)
            .is_some_and(looks_like_secret)
    });
    if let Some(ptr) = hit {
        bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
    }
    Ok(())
}

/// Very short values are never flagged.
fn looks_like_secret(s: &str) -> bool {
    let s = s.trim();
    s.len() >= 8 && SECRET_PREFIXES.iter().any(|p| s.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_scalars_and_keep_siblings() {
        let base = "indexer:\n  endpoint: http://a\n  listed_limit: 20\n";
        let overlay = "indexer:\n  listed_limit: 50\n";
        let loaded = load_layered_yaml_from_strings(&[base, overlay]).unwrap();

        assert_eq!(loaded.config_json["indexer"]["endpoint"], "http://a");
        assert_eq!(loaded.config_json["indexer"]["listed_limit"], 50);
    }

    #[test]
    fn empty_document_is_an_empty_layer() {
        let a = load_layered_yaml_from_strings(&["indexer:\n  listed_limit: 5\n"]).unwrap();
        let b = load_layered_yaml_from_strings(&["indexer:\n  listed_limit: 5\n", ""]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn short_strings_are_never_secrets() {
        assert!(!looks_like_secret("sk-1"));
        assert!(looks_like_secret("sk-live-0123456789"));
        assert!(!looks_like_secret("MARKET_COMPLIANCE_KEY"));
    }
}
