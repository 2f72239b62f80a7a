//! nfm-schemas
//!
//! Marketplace event and view types shared by every crate in the workspace.
//! Field names on the wire follow the indexer's camelCase GraphQL schema.
//! Nothing here performs IO.

mod error;

pub use error::FetchError;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Listing identity
// ---------------------------------------------------------------------------

/// Identity of a listing: `(nftAddress, tokenId)`.
///
/// Built from the values exactly as received. Only `ActiveListing` carries
/// trimmed addresses; keys used for exclusion are never normalised.
/// Exclusion compares the `Display` form, `"{nftAddress}-{tokenId}"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingKey {
    pub nft_address: String,
    pub token_id: String,
}

impl ListingKey {
    pub fn new(nft_address: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            nft_address: nft_address.into(),
            token_id: token_id.into(),
        }
    }

    /// `false` when either half is empty; such keys never identify a listing.
    pub fn is_complete(&self) -> bool {
        !self.nft_address.is_empty() && !self.token_id.is_empty()
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.nft_address, self.token_id)
    }
}

// ---------------------------------------------------------------------------
// Raw events (as delivered by the indexer)
// ---------------------------------------------------------------------------

/// A listing-created event. Immutable once observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedEvent {
    #[serde(rename = "rindexerId", alias = "id", default, deserialize_with = "nullable_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub seller: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub nft_address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub token_id: String,
    /// uint256 in wei, kept as a decimal string.
    #[serde(default, deserialize_with = "nullable_string")]
    pub price: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub contract_address: String,
    #[serde(default, deserialize_with = "block_number")]
    pub block_number: u64,
    #[serde(default, deserialize_with = "nullable_string")]
    pub tx_hash: String,
}

impl ListedEvent {
    pub fn key(&self) -> ListingKey {
        ListingKey::new(self.nft_address.clone(), self.token_id.clone())
    }
}

/// A listed item was bought.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEvent {
    #[serde(default, deserialize_with = "nullable_string")]
    pub nft_address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub token_id: String,
}

impl SaleEvent {
    pub fn new(nft_address: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            nft_address: nft_address.into(),
            token_id: token_id.into(),
        }
    }

    pub fn key(&self) -> ListingKey {
        ListingKey::new(self.nft_address.clone(), self.token_id.clone())
    }
}

/// A listed item was withdrawn by its seller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelEvent {
    #[serde(default, deserialize_with = "nullable_string")]
    pub nft_address: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub token_id: String,
}

impl CancelEvent {
    pub fn new(nft_address: impl Into<String>, token_id: impl Into<String>) -> Self {
        Self {
            nft_address: nft_address.into(),
            token_id: token_id.into(),
        }
    }

    pub fn key(&self) -> ListingKey {
        ListingKey::new(self.nft_address.clone(), self.token_id.clone())
    }
}

/// One response worth of the three feeds. `listed` is newest-first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFeeds {
    pub listed: Vec<ListedEvent>,
    pub sold: Vec<SaleEvent>,
    pub canceled: Vec<CancelEvent>,
}

// ---------------------------------------------------------------------------
// Reconciled listing
// ---------------------------------------------------------------------------

/// A currently purchasable listing, ready for display.
///
/// Same fields as [`ListedEvent`]; `nft_address` and `contract_address` are trimmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveListing {
    pub id: String,
    pub seller: String,
    pub nft_address: String,
    pub token_id: String,
    pub price: String,
    pub contract_address: String,
    pub block_number: u64,
    pub tx_hash: String,
}

impl ActiveListing {
    pub fn from_listed(ev: &ListedEvent) -> Self {
        Self {
            id: ev.id.clone(),
            seller: ev.seller.clone(),
            nft_address: ev.nft_address.trim().to_string(),
            token_id: ev.token_id.clone(),
            price: ev.price.clone(),
            contract_address: ev.contract_address.trim().to_string(),
            block_number: ev.block_number,
            tx_hash: ev.tx_hash.clone(),
        }
    }

    /// Route of the purchase page for this listing.
    pub fn detail_path(&self) -> String {
        format!("/buy-nft/{}/{}", self.contract_address, self.token_id)
    }

    /// Stable per-card identity used by the listing grid.
    pub fn render_key(&self) -> String {
        format!("{}-{}", self.contract_address, self.token_id)
    }
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

/// Viewer approval, scoped to one wallet address for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Unknown,
    Pending,
    Approved,
    Denied,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Unknown => "unknown",
            ComplianceStatus::Pending => "pending",
            ComplianceStatus::Approved => "approved",
            ComplianceStatus::Denied => "denied",
        }
    }

    /// `true` once a check has committed a verdict.
    pub fn is_settled(&self) -> bool {
        matches!(self, ComplianceStatus::Approved | ComplianceStatus::Denied)
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /compliance`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRequest {
    pub address: String,
}

/// Body returned by the compliance oracle. Missing fields read as `false`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_approved: bool,
}

impl ComplianceResponse {
    /// Only `{success: true, isApproved: true}` approves.
    pub fn approves(&self) -> bool {
        self.success && self.is_approved
    }
}

// ---------------------------------------------------------------------------
// Deserialisation helpers
// ---------------------------------------------------------------------------

fn nullable_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

/// Block numbers arrive as JSON numbers or, for BigInt columns, decimal strings.
fn block_number<'de, D>(d: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(d)? {
        None => Ok(0),
        Some(NumberOrString::Number(n)) => Ok(n),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid blockNumber '{s}': {e}"))),
    }
}
