//! GraphQL-over-HTTP [`EventSource`].
//!
//! `POST <endpoint>` with `{"query": ..., "variables": ...}`; the response is
//! the usual `{"data": ..., "errors": [...]}` envelope.

use std::time::Duration;

use nfm_schemas::{CancelEvent, EventFeeds, FetchError, ListedEvent, SaleEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::query::{recent_listings_query, terminal_page_query, QueryOptions, TerminalFeed};
use crate::EventSource;

/// Indexer client. Cheap to clone (shares the connection pool).
#[derive(Debug, Clone)]
pub struct GraphQlEventSource {
    http: reqwest::Client,
    endpoint: String,
    opts: QueryOptions,
}

impl GraphQlEventSource {
    /// Build a client with its own connection pool and a per-request timeout.
    pub fn new(endpoint: impl Into<String>, opts: QueryOptions, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoint, opts))
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>, opts: QueryOptions) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            opts,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> &QueryOptions {
        &self.opts
    }

    async fn post<D: DeserializeOwned>(
        &self,
        query: String,
        variables: Option<Value>,
    ) -> Result<D, FetchError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: GraphQlResponse<D> = resp.json().await.map_err(|e| {
            if e.is_decode() {
                FetchError::Malformed(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        if let Some(first) = body.errors.first() {
            return Err(FetchError::Malformed(format!(
                "graphql errors ({}): {}",
                body.errors.len(),
                first.message
            )));
        }

        body.data
            .ok_or_else(|| FetchError::Malformed("response has no data".to_string()))
    }

    async fn fetch_all(&self) -> Result<EventFeeds, FetchError> {
        let data: RecentListingsData = self.post(recent_listings_query(&self.opts), None).await?;

        let mut sold = data.all_item_boughts.nodes;
        let mut canceled = data.all_item_canceleds.nodes;

        if let Some(page_size) = self.opts.terminal_page_size {
            self.drain_pages(
                TerminalFeed::Bought,
                page_size,
                data.all_item_boughts.page_info,
                &mut sold,
            )
            .await?;
            self.drain_pages(
                TerminalFeed::Canceled,
                page_size,
                data.all_item_canceleds.page_info,
                &mut canceled,
            )
            .await?;
        }

        Ok(EventFeeds {
            listed: data.all_item_listeds.nodes,
            sold,
            canceled,
        })
    }

    /// Walk the remaining pages of a terminal feed starting after `cursor`.
    ///
    /// A truncated terminal feed would show sold items as active, so any page
    /// that claims more data without a way to reach it is `Malformed`.
    async fn drain_pages<T: DeserializeOwned>(
        &self,
        feed: TerminalFeed,
        page_size: u32,
        mut page_info: Option<PageInfo>,
        out: &mut Vec<T>,
    ) -> Result<(), FetchError> {
        loop {
            let cursor = match page_info {
                Some(PageInfo {
                    has_next_page: true,
                    end_cursor: Some(cursor),
                }) => cursor,
                Some(PageInfo {
                    has_next_page: true,
                    end_cursor: None,
                }) => {
                    return Err(FetchError::Malformed(format!(
                        "{} has a next page but no end cursor",
                        feed.connection()
                    )))
                }
                _ => return Ok(()),
            };

            debug!(connection = feed.connection(), %cursor, "fetching next terminal page");
            let mut data: Map<String, Value> = self
                .post(
                    terminal_page_query(feed, page_size),
                    Some(serde_json::json!({ "after": cursor })),
                )
                .await?;

            let conn = data.remove(feed.connection()).ok_or_else(|| {
                FetchError::Malformed(format!("missing connection {}", feed.connection()))
            })?;
            let conn: Connection<T> =
                serde_json::from_value(conn).map_err(|e| FetchError::Malformed(e.to_string()))?;

            if let Some(next) = conn.page_info.as_ref().filter(|p| p.has_next_page) {
                if conn.nodes.is_empty() {
                    return Err(FetchError::Malformed(format!(
                        "{} returned an empty page with more pages pending",
                        feed.connection()
                    )));
                }
                if next.end_cursor.as_deref() == Some(cursor.as_str()) {
                    return Err(FetchError::Malformed(format!(
                        "{} cursor {cursor} did not advance",
                        feed.connection()
                    )));
                }
            }
            out.extend(conn.nodes);
            page_info = conn.page_info;
        }
    }
}

#[async_trait::async_trait]
impl EventSource for GraphQlEventSource {
    fn source_name(&self) -> &'static str {
        "graphql"
    }

    async fn fetch_events(&self) -> Result<EventFeeds, FetchError> {
        let result = self.fetch_all().await;

        match &result {
            Ok(feeds) => info!(
                endpoint = %self.endpoint,
                listed = feeds.listed.len(),
                sold = feeds.sold.len(),
                canceled = feeds.canceled.len(),
                "indexer fetch ok"
            ),
            Err(err) => warn!(endpoint = %self.endpoint, kind = err.kind(), %err, "indexer fetch failed"),
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentListingsData {
    all_item_listeds: Connection<ListedEvent>,
    all_item_boughts: Connection<SaleEvent>,
    all_item_canceleds: Connection<CancelEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    nodes: Vec<T>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}
