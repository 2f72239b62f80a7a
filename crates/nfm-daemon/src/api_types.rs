//! Request and response types for nfm-daemon HTTP endpoints.
//!
//! `Serialize + Deserialize` so Axum can encode them and tests can decode
//! them. Listings and the page view reuse `nfm_view` types directly.

use nfm_schemas::ComplianceStatus;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// /v1/session/address
// ---------------------------------------------------------------------------

/// `null` or an empty string disconnects the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAddressRequest {
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub address: Option<String>,
    /// Viewer-facing status (pending policy applied).
    pub status: ComplianceStatus,
    /// `true` when this call issued a new compliance check.
    pub check_issued: bool,
}

// ---------------------------------------------------------------------------
// /v1/compliance/:address
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceStatusResponse {
    pub address: String,
    pub status: ComplianceStatus,
}
