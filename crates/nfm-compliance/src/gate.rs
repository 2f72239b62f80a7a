//! Compliance gate state machine.
//!
//! # States
//!
//! ```text
//!   Unknown ──(non-empty address)──► Pending ──(success && isApproved)──► Approved
//!      ▲                               │
//!      └──(address cleared)            └──(anything else)──────────────► Denied
//!
//!   Approved | Denied | Pending ──(different non-empty address)──► Pending
//! ```
//!
//! # Invariants
//!
//! - **One check per address change**: re-observing the current address is a
//!   no-op; a check ticket is issued only when the address changes to a
//!   non-empty value.
//! - **Generation-guarded commit**: each address change bumps a generation.
//!   A response commits only if its ticket's generation is still current, so a
//!   late answer for address A never lands on address B.
//! - **Fail-closed verdicts**: transport failure, non-2xx, malformed body and
//!   an explicit denial all commit `Denied`.
//! - **No timers**: nothing re-checks an address on its own.
//!
//! The state lives in a `tokio::sync::watch` channel; every transition is a
//! single `send_if_modified` call, so readers always see a consistent
//! `(address, generation, status)` triple and subscribers are woken on change.

use std::sync::Arc;
use std::time::Duration;

use nfm_schemas::{ComplianceResponse, ComplianceStatus, FetchError};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ComplianceOracle;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What viewers see while a check is outstanding.
///
/// `Approved` shows content before the verdict arrives (fail-open window);
/// `Denied` hides it behind the denial message; `HideContent` hides it behind a
/// pending indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultBeforeCheck {
    #[default]
    Approved,
    Denied,
    HideContent,
}

impl DefaultBeforeCheck {
    /// Status exposed to viewers for a raw `Pending` state.
    pub fn pending_as(&self) -> ComplianceStatus {
        match self {
            DefaultBeforeCheck::Approved => ComplianceStatus::Approved,
            DefaultBeforeCheck::Denied => ComplianceStatus::Denied,
            DefaultBeforeCheck::HideContent => ComplianceStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a check ended in `Denied`. Logged and inspectable, never surfaced as a
/// distinct viewer status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// Oracle answered, but not with `{success: true, isApproved: true}`.
    OracleDenied { success: bool, is_approved: bool },
    NetworkFailure { detail: String },
    HttpStatus { status: u16 },
    MalformedResponse { detail: String },
}

impl From<FetchError> for DenialReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(detail) => DenialReason::NetworkFailure { detail },
            FetchError::HttpStatus { status } => DenialReason::HttpStatus { status },
            FetchError::Malformed(detail) => DenialReason::MalformedResponse { detail },
        }
    }
}

/// Result of one oracle round-trip, already mapped fail-closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Approved,
    Denied(DenialReason),
}

impl CheckOutcome {
    pub fn from_response(result: Result<ComplianceResponse, FetchError>) -> Self {
        match result {
            Ok(body) if body.approves() => CheckOutcome::Approved,
            Ok(body) => CheckOutcome::Denied(DenialReason::OracleDenied {
                success: body.success,
                is_approved: body.is_approved,
            }),
            Err(err) => CheckOutcome::Denied(err.into()),
        }
    }

    pub fn status(&self) -> ComplianceStatus {
        match self {
            CheckOutcome::Approved => ComplianceStatus::Approved,
            CheckOutcome::Denied(_) => ComplianceStatus::Denied,
        }
    }
}

// ---------------------------------------------------------------------------
// Gate state
// ---------------------------------------------------------------------------

/// Permission to run exactly one check for one address at one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckTicket {
    address: String,
    generation: u64,
}

impl CheckTicket {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Consistent view of the gate at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub address: Option<String>,
    /// Bumped on every address change; starts at 0.
    pub generation: u64,
    /// Raw state-machine status.
    pub status: ComplianceStatus,
    /// Status after applying [`DefaultBeforeCheck`] to `Pending`.
    pub effective: ComplianceStatus,
    pub last_denial: Option<DenialReason>,
}

// ---------------------------------------------------------------------------
// ComplianceGate
// ---------------------------------------------------------------------------

pub struct ComplianceGate {
    oracle: Arc<dyn ComplianceOracle>,
    default_before_check: DefaultBeforeCheck,
    check_timeout: Option<Duration>,
    state: watch::Sender<GateSnapshot>,
}

impl ComplianceGate {
    pub fn new(oracle: Arc<dyn ComplianceOracle>, default_before_check: DefaultBeforeCheck) -> Self {
        let (state, _rx) = watch::channel(GateSnapshot {
            address: None,
            generation: 0,
            status: ComplianceStatus::Unknown,
            effective: ComplianceStatus::Unknown,
            last_denial: None,
        });
        Self {
            oracle,
            default_before_check,
            check_timeout: None,
            state,
        }
    }

    /// Bound every oracle call; an expired check commits `Denied`.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn default_before_check(&self) -> DefaultBeforeCheck {
        self.default_before_check
    }

    fn effective(&self, status: ComplianceStatus) -> ComplianceStatus {
        match status {
            ComplianceStatus::Pending => self.default_before_check.pending_as(),
            other => other,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> GateSnapshot {
        self.state.borrow().clone()
    }

    /// Raw state-machine status for the current address.
    pub fn status(&self) -> ComplianceStatus {
        self.state.borrow().status
    }

    /// Viewer-facing status for the current address.
    pub fn effective_status(&self) -> ComplianceStatus {
        self.state.borrow().effective
    }

    /// Viewer-facing status for `address`; `Unknown` unless it is the current one.
    pub fn status_for(&self, address: &str) -> ComplianceStatus {
        let st = self.state.borrow();
        if st.address.as_deref() == Some(address) {
            st.effective
        } else {
            ComplianceStatus::Unknown
        }
    }

    pub fn current_address(&self) -> Option<String> {
        self.state.borrow().address.clone()
    }

    pub fn last_denial(&self) -> Option<DenialReason> {
        self.state.borrow().last_denial.clone()
    }

    /// Wake-on-change receiver for every transition.
    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.state.subscribe()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Record the viewer's address.
    ///
    /// Returns a ticket iff a check must now be issued. A cleared or empty
    /// address moves to `Unknown` and invalidates any outstanding ticket.
    pub fn observe_address(&self, address: Option<&str>) -> Option<CheckTicket> {
        let address = address.filter(|a| !a.is_empty());
        let mut ticket = None;

        self.state.send_if_modified(|st| {
            if st.address.as_deref() == address {
                return false;
            }

            let from = st.status;
            st.generation += 1;
            st.address = address.map(str::to_string);
            st.last_denial = None;
            st.status = match address {
                Some(a) => {
                    ticket = Some(CheckTicket {
                        address: a.to_string(),
                        generation: st.generation,
                    });
                    ComplianceStatus::Pending
                }
                None => ComplianceStatus::Unknown,
            };
            st.effective = self.effective(st.status);

            info!(
                address = st.address.as_deref().unwrap_or(""),
                generation = st.generation,
                %from,
                to = %st.status,
                "compliance address changed"
            );
            true
        });

        ticket
    }

    /// Commit a verdict. Returns `false` (and changes nothing) when the ticket
    /// is stale or the check was already settled.
    pub fn commit(&self, ticket: &CheckTicket, outcome: CheckOutcome) -> bool {
        self.state.send_if_modified(|st| {
            if st.generation != ticket.generation || st.status != ComplianceStatus::Pending {
                debug!(
                    ticket_address = %ticket.address,
                    ticket_generation = ticket.generation,
                    current_generation = st.generation,
                    "discarding stale compliance response"
                );
                return false;
            }

            let from = st.status;
            st.status = outcome.status();
            st.effective = st.status;
            st.last_denial = match &outcome {
                CheckOutcome::Approved => None,
                CheckOutcome::Denied(reason) => Some(reason.clone()),
            };

            match &st.last_denial {
                None => info!(
                    address = %ticket.address,
                    generation = ticket.generation,
                    %from,
                    to = %st.status,
                    "compliance approved"
                ),
                Some(reason) => warn!(
                    address = %ticket.address,
                    generation = ticket.generation,
                    %from,
                    to = %st.status,
                    ?reason,
                    "compliance denied"
                ),
            }
            true
        })
    }

    /// Call the oracle for `ticket` and commit the outcome if still current.
    ///
    /// Returns the committed status, or `None` if the response was stale.
    pub async fn run_check(&self, ticket: CheckTicket) -> Option<ComplianceStatus> {
        let call = self.oracle.check(&ticket.address);
        let result = match self.check_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(r) => r,
                Err(_) => Err(FetchError::Network(format!(
                    "compliance check timed out after {}ms",
                    limit.as_millis()
                ))),
            },
            None => call.await,
        };

        let outcome = CheckOutcome::from_response(result);
        let status = outcome.status();
        self.commit(&ticket, outcome).then_some(status)
    }

    /// Observe `address` and, if a check is due, run it on the tokio runtime.
    ///
    /// The in-flight request is never cancelled; a stale answer is simply
    /// discarded when it arrives.
    pub fn set_address(
        self: &Arc<Self>,
        address: Option<&str>,
    ) -> Option<JoinHandle<Option<ComplianceStatus>>> {
        let ticket = self.observe_address(address)?;
        let gate = Arc::clone(self);
        Some(tokio::spawn(async move { gate.run_check(ticket).await }))
    }
}
