//! nfm-view
//!
//! View-state layer: a keyed query cache over the indexer, the reconciled
//! listings query built on it, and the coordinator that combines listings
//! with the viewer's compliance status.
//!
//! Staleness is bounded only by the host's refetch policy ([`CachePolicy`]);
//! no on-chain signal invalidates the cache.

pub mod cache;
pub mod coordinator;
pub mod listings;

pub use cache::{CachePolicy, CacheState, FetchMode, QueryCache};
pub use coordinator::{MarketplaceView, ViewCoordinator};
pub use listings::{ListingsQuery, ListingsView, RECENT_LISTINGS_KEY};
