//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (e.g. `compliance.api_key_env:
//! "MARKET_COMPLIANCE_KEY"`). Hosts call [`resolve_secrets`] once at startup
//! and pass the result into constructors. Values are redacted in `Debug`
//! output, and error messages mention the variable NAME only.

use anyhow::{bail, Result};

use crate::MarketConfig;

#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Bearer key for the compliance oracle. `None` when no env var is named.
    pub compliance_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "compliance_api_key",
                &self.compliance_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve every secret the config names.
///
/// A named variable that is unset or blank is an error: the operator asked
/// for an authenticated oracle and would otherwise get an unauthenticated one.
pub fn resolve_secrets(cfg: &MarketConfig) -> Result<ResolvedSecrets> {
    let compliance_api_key = match cfg
        .compliance
        .api_key_env
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        None => None,
        Some(name) => match resolve_env(name) {
            Some(v) => Some(v),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (compliance api key) is not set or empty",
                name
            ),
        },
    };

    Ok(ResolvedSecrets { compliance_api_key })
}
