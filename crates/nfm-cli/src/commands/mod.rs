//! Command handler modules for the nfm CLI.
//!
//! Shared config loading lives here; command logic lives in the submodules.

pub mod check;
pub mod listings;

use anyhow::Result;
use nfm_config::{
    load_layered_yaml, report_unused_keys, LoadedConfig, MarketConfig, UnusedKeyPolicy,
};
use tracing::warn;

/// Load layered config (defaults when `paths` is empty) and warn on unused keys.
pub fn load_settings(paths: &[String]) -> Result<(LoadedConfig, MarketConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }

    let cfg = loaded.settings()?;
    Ok((loaded, cfg))
}
