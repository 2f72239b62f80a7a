//! nfm-testkit
//!
//! Fakes and fixtures for cross-crate scenario tests:
//!
//! - [`ScriptedOracle`]: compliance oracle whose answers are released by the
//!   test, one call at a time, so response ordering is fully controlled.
//! - [`ScriptedSource`]: event source replaying a queue of results, optionally
//!   held until the test grants permits.
//! - fixture builders and a JSON feed loader.

mod oracle;
mod source;

pub use oracle::{PendingCheck, ScriptedOracle};
pub use source::ScriptedSource;

use anyhow::{Context, Result};
use nfm_schemas::{CancelEvent, EventFeeds, ListedEvent, SaleEvent};
use std::fs;

/// A well-formed listed event for `(nft, token)` at `block`.
pub fn listed(nft: &str, token: &str, block: u64) -> ListedEvent {
    ListedEvent {
        id: format!("{nft}-{token}-{block}"),
        seller: "0x00000000000000000000000000000000000000a1".to_string(),
        nft_address: nft.to_string(),
        token_id: token.to_string(),
        price: "1000000000000000000".to_string(),
        contract_address: "0x00000000000000000000000000000000000000c0".to_string(),
        block_number: block,
        tx_hash: format!("0x{block:064x}"),
    }
}

pub fn sold(nft: &str, token: &str) -> SaleEvent {
    SaleEvent::new(nft, token)
}

pub fn canceled(nft: &str, token: &str) -> CancelEvent {
    CancelEvent::new(nft, token)
}

/// `n` distinct listings, newest first (block `n` down to 1).
pub fn newest_first(nft: &str, n: usize) -> Vec<ListedEvent> {
    (1..=n)
        .rev()
        .map(|i| listed(nft, &i.to_string(), i as u64))
        .collect()
}

/// Load an [`EventFeeds`] JSON fixture (`{listed, sold, canceled}`).
pub fn load_feeds_json(path: &str) -> Result<EventFeeds> {
    let s = fs::read_to_string(path).with_context(|| format!("read feeds fixture: {path}"))?;
    serde_json::from_str(&s).with_context(|| format!("parse feeds fixture: {path}"))
}
