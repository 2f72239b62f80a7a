//! Combines the compliance gate and the listings query into one renderable state.
//!
//! The two derivations are independent: listings are fetched whether or not
//! compliance has resolved, and only the final view consults both.

use std::sync::Arc;

use nfm_compliance::ComplianceGate;
use nfm_schemas::ComplianceStatus;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::listings::{ListingsQuery, ListingsView};

/// What the marketplace page shows right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketplaceView {
    /// No wallet connected; prompt to connect one.
    WalletDisconnected,
    /// Verdict outstanding and the pending policy hides content.
    AwaitingCompliance { address: String },
    Denied { address: String },
    Listings {
        address: String,
        #[serde(flatten)]
        listings: ListingsView,
    },
}

impl MarketplaceView {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketplaceView::WalletDisconnected => "wallet_disconnected",
            MarketplaceView::AwaitingCompliance { .. } => "awaiting_compliance",
            MarketplaceView::Denied { .. } => "denied",
            MarketplaceView::Listings { .. } => "listings",
        }
    }
}

pub struct ViewCoordinator {
    gate: Arc<ComplianceGate>,
    listings: Arc<ListingsQuery>,
}

impl ViewCoordinator {
    pub fn new(gate: Arc<ComplianceGate>, listings: Arc<ListingsQuery>) -> Self {
        Self { gate, listings }
    }

    pub fn gate(&self) -> &Arc<ComplianceGate> {
        &self.gate
    }

    pub fn listings(&self) -> &Arc<ListingsQuery> {
        &self.listings
    }

    /// Forward a wallet change to the gate; returns the spawned check, if any.
    pub fn set_address(&self, address: Option<&str>) -> Option<JoinHandle<Option<ComplianceStatus>>> {
        self.gate.set_address(address)
    }

    pub fn compliance_status(&self, address: &str) -> ComplianceStatus {
        self.gate.status_for(address)
    }

    /// Listings for display, fetching if the cached copy is stale.
    pub async fn active_listings(&self) -> ListingsView {
        self.listings.fetch().await
    }

    /// Current page state from cached data only.
    ///
    /// Approved viewers whose listings were never requested see `is_loading`.
    pub fn view(&self) -> MarketplaceView {
        let snap = self.gate.snapshot();
        let Some(address) = snap.address else {
            return MarketplaceView::WalletDisconnected;
        };

        match snap.effective {
            ComplianceStatus::Approved => {
                let mut listings = self.listings.current();
                if listings.updated_at.is_none() && listings.error.is_none() {
                    listings.is_loading = true;
                }
                MarketplaceView::Listings { address, listings }
            }
            ComplianceStatus::Denied => MarketplaceView::Denied { address },
            ComplianceStatus::Pending | ComplianceStatus::Unknown => {
                MarketplaceView::AwaitingCompliance { address }
            }
        }
    }

    /// Like [`view`](Self::view), but an approved viewer with no listings yet
    /// waits for the first successful fetch (joining one in flight).
    pub async fn load_view(&self) -> MarketplaceView {
        let snap = self.gate.snapshot();
        let approved = snap.address.is_some() && snap.effective == ComplianceStatus::Approved;
        if approved && self.listings.current().updated_at.is_none() {
            self.listings.fetch().await;
        }
        self.view()
    }
}
