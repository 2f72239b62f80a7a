//! nfm-indexer
//!
//! Event-source boundary for the marketplace indexer.
//!
//! This crate owns the [`EventSource`] contract and the GraphQL-over-HTTP
//! implementation. It performs no retries and no caching; callers (the view
//! layer) decide when to refetch.

pub mod graphql;
pub mod query;

pub use graphql::GraphQlEventSource;
pub use query::{
    recent_listings_query, terminal_page_query, QueryOptions, TerminalFeed, DEFAULT_LISTED_LIMIT,
};

use nfm_schemas::{EventFeeds, FetchError};

/// One queryable log of marketplace events.
///
/// A single call returns, in one response:
/// - up to `listed_limit` newest listed events, ordered by
///   `(blockNumber, transactionIndex, logIndex)` descending;
/// - every sale event;
/// - every cancel event.
///
/// Implementations must be `Send + Sync` so a view layer can share one source
/// across tasks behind an `Arc`.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Human-readable name for logs (e.g. `"graphql"`).
    fn source_name(&self) -> &'static str;

    async fn fetch_events(&self) -> Result<EventFeeds, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfm_schemas::SaleEvent;

    struct FixedSource(EventFeeds);

    #[async_trait::async_trait]
    impl EventSource for FixedSource {
        fn source_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_events(&self) -> Result<EventFeeds, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn source_is_object_safe_via_box() {
        let feeds = EventFeeds {
            sold: vec![SaleEvent::new("0xA", "1")],
            ..EventFeeds::default()
        };
        let src: Box<dyn EventSource> = Box::new(FixedSource(feeds.clone()));

        assert_eq!(src.source_name(), "fixed");
        assert_eq!(src.fetch_events().await.unwrap(), feeds);
    }
}
