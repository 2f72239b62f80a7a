//! Keyed query cache with last-good retention and in-flight deduplication.
//!
//! # Invariants
//!
//! - **Single flight**: at most one fetch per key is in flight; concurrent
//!   callers join it and receive the same result.
//! - **Last good wins**: a failed fetch records its error but never clears
//!   previously fetched data.
//! - **Freshness window**: data younger than `stale_after` is served without
//!   a fetch. `stale_after == 0` means every `IfStale` call refetches (still
//!   deduplicated against an in-flight fetch).
//! - **No external invalidation**: entries go stale by age or by an explicit
//!   [`QueryCache::invalidate`]; on-chain events do not reach this layer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use nfm_schemas::FetchError;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>, FetchError>>>;

/// Host-tunable refetch parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Age after which cached data is refetched on the next read.
    pub stale_after: Duration,
    /// Background refetch period, if the host runs one.
    pub refetch_interval: Option<Duration>,
}

/// Whether a fetch may be satisfied from fresh cached data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    IfStale,
    Force,
}

/// Read-only view of one cache entry.
#[derive(Debug)]
pub struct CacheState<T> {
    pub data: Option<Arc<T>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub error: Option<FetchError>,
    pub is_fetching: bool,
    pub is_stale: bool,
}

struct Entry<T> {
    data: Option<Arc<T>>,
    fetched_at: Option<Instant>,
    updated_at: Option<DateTime<Utc>>,
    error: Option<FetchError>,
    in_flight: Option<(u64, SharedFetch<T>)>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            updated_at: None,
            error: None,
            in_flight: None,
        }
    }
}

impl<T> Entry<T> {
    fn is_stale(&self, stale_after: Duration) -> bool {
        match self.fetched_at {
            Some(at) => at.elapsed() >= stale_after,
            None => true,
        }
    }
}

pub struct QueryCache<T> {
    policy: CachePolicy,
    entries: Mutex<HashMap<String, Entry<T>>>,
    next_fetch_id: AtomicU64,
}

impl<T> QueryCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
            next_fetch_id: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        // Entries are plain data; a panic mid-update cannot leave them torn.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of `key` without triggering a fetch.
    pub fn peek(&self, key: &str) -> CacheState<T> {
        let entries = self.lock();
        match entries.get(key) {
            Some(e) => CacheState {
                data: e.data.clone(),
                updated_at: e.updated_at,
                error: e.error.clone(),
                is_fetching: e.in_flight.is_some(),
                is_stale: e.is_stale(self.policy.stale_after),
            },
            None => CacheState {
                data: None,
                updated_at: None,
                error: None,
                is_fetching: false,
                is_stale: true,
            },
        }
    }

    /// Mark `key` stale; data is kept until the next successful fetch.
    pub fn invalidate(&self, key: &str) {
        if let Some(e) = self.lock().get_mut(key) {
            e.fetched_at = None;
        }
    }

    /// Return cached data for `key`, joining or starting a fetch as needed.
    ///
    /// `fetch` is only invoked when this call starts a new flight.
    pub async fn fetch<F, Fut>(&self, key: &str, mode: FetchMode, fetch: F) -> Result<Arc<T>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (id, flight) = {
            let mut entries = self.lock();
            let entry = entries.entry(key.to_string()).or_default();

            if mode == FetchMode::IfStale && !entry.is_stale(self.policy.stale_after) {
                if let Some(data) = &entry.data {
                    debug!(%key, "cache hit");
                    return Ok(Arc::clone(data));
                }
            }

            match &entry.in_flight {
                Some((id, flight)) => {
                    debug!(%key, fetch_id = id, "joining in-flight fetch");
                    (*id, flight.clone())
                }
                None => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let flight = fetch().map(|r| r.map(Arc::new)).boxed().shared();
                    entry.in_flight = Some((id, flight.clone()));
                    debug!(%key, fetch_id = id, ?mode, "starting fetch");
                    (id, flight)
                }
            }
        };

        let result = flight.await;
        self.settle(key, id, &result);
        result
    }

    /// Record the outcome of flight `id`. Only the first waiter to arrive
    /// writes; later waiters find the flight already cleared.
    fn settle(&self, key: &str, id: u64, result: &Result<Arc<T>, FetchError>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if !matches!(&entry.in_flight, Some((current, _)) if *current == id) {
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.fetched_at = Some(Instant::now());
                entry.updated_at = Some(Utc::now());
                entry.error = None;
            }
            Err(err) => {
                entry.error = Some(err.clone());
            }
        }
    }
}
