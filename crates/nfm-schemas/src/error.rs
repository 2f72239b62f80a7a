//! Failure type shared by every outbound call (indexer query, compliance check).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a call to the indexer or the compliance oracle did not produce a usable body.
///
/// `Clone` so one failed in-flight fetch can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FetchError {
    /// Transport-level failure: connect, TLS, timeout, reset.
    #[error("network failure: {0}")]
    #[serde(rename = "network_failure")]
    Network(String),
    /// The endpoint answered with a non-2xx status.
    #[error("http status {status}")]
    #[serde(rename = "http_status")]
    HttpStatus { status: u16 },
    /// The body did not match the expected shape.
    #[error("malformed response: {0}")]
    #[serde(rename = "malformed_response")]
    Malformed(String),
}

impl FetchError {
    /// Short stable label for logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network_failure",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::Malformed(_) => "malformed_response",
        }
    }
}
