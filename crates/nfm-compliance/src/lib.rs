//! nfm-compliance
//!
//! Compliance gating of marketplace content by viewer wallet address.
//!
//! - [`ComplianceOracle`]: the remote approve/deny decision, consumed as a contract.
//! - [`HttpComplianceOracle`]: `POST <endpoint>` with `{"address": ...}`.
//! - [`ComplianceGate`]: per-address state machine; one check per address
//!   change, stale responses discarded, every failure mode fails closed.

pub mod gate;
pub mod oracle;

pub use gate::{
    CheckOutcome, CheckTicket, ComplianceGate, DefaultBeforeCheck, DenialReason, GateSnapshot,
};
pub use oracle::HttpComplianceOracle;

use nfm_schemas::{ComplianceResponse, FetchError};

/// Remote oracle deciding whether a wallet address may view marketplace content.
#[async_trait::async_trait]
pub trait ComplianceOracle: Send + Sync {
    fn oracle_name(&self) -> &'static str;

    /// One check for one address. No retries.
    async fn check(&self, address: &str) -> Result<ComplianceResponse, FetchError>;
}
