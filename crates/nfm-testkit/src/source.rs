use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use nfm_indexer::EventSource;
use nfm_schemas::{EventFeeds, FetchError};
use tokio::sync::Semaphore;

/// Event source replaying queued results in order.
///
/// When built with [`ScriptedSource::held`], each fetch waits for one permit
/// from [`ScriptedSource::release`] before answering. An exhausted queue
/// answers with a network failure.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<EventFeeds, FetchError>>>,
    hold: Option<Semaphore>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(responses: impl IntoIterator<Item = Result<EventFeeds, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            hold: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn held(responses: impl IntoIterator<Item = Result<EventFeeds, FetchError>>) -> Self {
        Self {
            hold: Some(Semaphore::new(0)),
            ..Self::new(responses)
        }
    }

    /// Let `n` held fetches complete.
    pub fn release(&self, n: usize) {
        if let Some(hold) = &self.hold {
            hold.add_permits(n);
        }
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventSource for ScriptedSource {
    fn source_name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_events(&self) -> Result<EventFeeds, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            match hold.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(FetchError::Network("scripted source closed".to_string())),
            }
        }
        self.responses
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("scripted source exhausted".to_string())))
    }
}
