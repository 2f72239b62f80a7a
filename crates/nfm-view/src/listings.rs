use std::sync::Arc;

use chrono::{DateTime, Utc};
use nfm_indexer::EventSource;
use nfm_reconcile::{reconcile_with, ReconcilePolicy};
use nfm_schemas::{ActiveListing, FetchError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CachePolicy, CacheState, FetchMode, QueryCache};

/// Cache key shared by every reader of the reconciled listings.
pub const RECENT_LISTINGS_KEY: &str = "recentListings";

/// What the presentation layer renders for the listings grid.
///
/// `listings` is empty until the first successful fetch; after that it always
/// holds the last good result, even while `error` reports a newer failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingsView {
    pub listings: Vec<ActiveListing>,
    /// No data yet and a fetch is running.
    pub is_loading: bool,
    /// Any fetch is running, including a background refresh.
    pub is_fetching: bool,
    pub error: Option<FetchError>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ListingsView {
    fn from_state(st: CacheState<Vec<ActiveListing>>) -> Self {
        Self {
            is_loading: st.data.is_none() && st.is_fetching,
            is_fetching: st.is_fetching,
            listings: st.data.map(|d| d.as_ref().clone()).unwrap_or_default(),
            error: st.error,
            updated_at: st.updated_at,
        }
    }
}

/// Event source + reconciler behind the `"recentListings"` cache entry.
pub struct ListingsQuery {
    source: Arc<dyn EventSource>,
    policy: ReconcilePolicy,
    cache: QueryCache<Vec<ActiveListing>>,
}

impl ListingsQuery {
    pub fn new(source: Arc<dyn EventSource>, policy: ReconcilePolicy, cache: CachePolicy) -> Self {
        Self {
            source,
            policy,
            cache: QueryCache::new(cache),
        }
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache.policy()
    }

    async fn load(&self, mode: FetchMode) -> ListingsView {
        let source = Arc::clone(&self.source);
        let policy = self.policy;

        let result = self
            .cache
            .fetch(RECENT_LISTINGS_KEY, mode, move || async move {
                let feeds = source.fetch_events().await?;
                Ok::<_, FetchError>(reconcile_with(
                    &policy,
                    &feeds.listed,
                    &feeds.sold,
                    &feeds.canceled,
                ))
            })
            .await;

        if let Err(err) = &result {
            debug!(kind = err.kind(), "listings fetch failed; serving last good data");
        }
        self.current()
    }

    /// Serve fresh cached listings or fetch (joining any in-flight fetch).
    pub async fn fetch(&self) -> ListingsView {
        self.load(FetchMode::IfStale).await
    }

    /// Fetch regardless of freshness. Still joins an in-flight fetch.
    pub async fn refetch(&self) -> ListingsView {
        self.load(FetchMode::Force).await
    }

    /// Current view without touching the network.
    pub fn current(&self) -> ListingsView {
        ListingsView::from_state(self.cache.peek(RECENT_LISTINGS_KEY))
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(RECENT_LISTINGS_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfm_schemas::{EventFeeds, ListedEvent, SaleEvent};
    use std::sync::Mutex;

    struct QueueSource(Mutex<Vec<Result<EventFeeds, FetchError>>>);

    #[async_trait::async_trait]
    impl EventSource for QueueSource {
        fn source_name(&self) -> &'static str {
            "queue"
        }

        async fn fetch_events(&self) -> Result<EventFeeds, FetchError> {
            self.0.lock().unwrap().remove(0)
        }
    }

    fn listed(nft: &str, token: &str) -> ListedEvent {
        ListedEvent {
            id: format!("{nft}-{token}"),
            seller: "0xSeller".to_string(),
            nft_address: nft.to_string(),
            token_id: token.to_string(),
            price: "1".to_string(),
            contract_address: "0xMarket".to_string(),
            block_number: 1,
            tx_hash: "0x0".to_string(),
        }
    }

    fn query(responses: Vec<Result<EventFeeds, FetchError>>) -> ListingsQuery {
        ListingsQuery::new(
            Arc::new(QueueSource(Mutex::new(responses))),
            ReconcilePolicy::default(),
            CachePolicy::default(),
        )
    }

    #[tokio::test]
    async fn initial_view_is_empty_and_idle() {
        let q = query(vec![]);
        let v = q.current();
        assert!(v.listings.is_empty());
        assert!(!v.is_loading);
        assert!(v.error.is_none());
        assert!(v.updated_at.is_none());
    }

    #[tokio::test]
    async fn fetch_reconciles_feeds() {
        let q = query(vec![Ok(EventFeeds {
            listed: vec![listed("0xA", "1"), listed("0xA", "2")],
            sold: vec![SaleEvent::new("0xA", "1")],
            canceled: vec![],
        })]);

        let v = q.fetch().await;
        assert_eq!(v.listings.len(), 1);
        assert_eq!(v.listings[0].token_id, "2");
        assert!(!v.is_loading);
        assert!(v.updated_at.is_some());
    }

    #[tokio::test]
    async fn failed_refetch_keeps_previous_listings() {
        let q = query(vec![
            Ok(EventFeeds {
                listed: vec![listed("0xA", "1")],
                ..EventFeeds::default()
            }),
            Err(FetchError::Network("connection reset".to_string())),
        ]);

        q.fetch().await;
        let v = q.refetch().await;

        assert_eq!(v.listings.len(), 1);
        assert_eq!(v.error, Some(FetchError::Network("connection reset".to_string())));
    }

    #[tokio::test]
    async fn first_failure_reports_error_with_no_listings() {
        let q = query(vec![Err(FetchError::HttpStatus { status: 503 })]);
        let v = q.fetch().await;

        assert!(v.listings.is_empty());
        assert!(!v.is_loading);
        assert_eq!(v.error, Some(FetchError::HttpStatus { status: 503 }));
    }
}
