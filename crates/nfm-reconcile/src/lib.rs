//! nfm-reconcile
//!
//! Derives the set of currently purchasable listings from the three raw
//! event feeds (listed, sold, canceled).
//!
//! - Any sale or cancel for a key excludes that key permanently. Event order
//!   is not consulted: a relisting of a previously sold item stays hidden.
//! - Listings missing `nftAddress` or `tokenId` are dropped.
//! - Output keeps the newest-first order of `listed` and is capped.
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::{reconcile, reconcile_report, reconcile_with};
pub use types::*;
