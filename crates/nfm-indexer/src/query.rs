//! GraphQL documents sent to the indexer.
//!
//! The indexer exposes a PostGraphile-style schema: each event table is a
//! connection (`allItemListeds`, `allItemBoughts`, `allItemCanceleds`)
//! wrapping a `nodes` array.

use serde::{Deserialize, Serialize};

/// Default number of most-recent listed events requested per query.
pub const DEFAULT_LISTED_LIMIT: u32 = 20;

/// Shape of the recent-listings query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// `first:` bound on the listed connection.
    pub listed_limit: u32,
    /// Page size for the sold/canceled connections.
    ///
    /// `None` requests both connections unbounded in one shot. `Some(n)`
    /// requests `n` at a time and follows `endCursor` until exhausted.
    pub terminal_page_size: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            listed_limit: DEFAULT_LISTED_LIMIT,
            terminal_page_size: None,
        }
    }
}

/// The two unbounded terminal-event connections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalFeed {
    Bought,
    Canceled,
}

impl TerminalFeed {
    pub fn connection(&self) -> &'static str {
        match self {
            TerminalFeed::Bought => "allItemBoughts",
            TerminalFeed::Canceled => "allItemCanceleds",
        }
    }
}

const LISTED_FIELDS: &str = "rindexerId seller nftAddress tokenId price contractAddress blockNumber txHash";
const TERMINAL_FIELDS: &str = "nftAddress tokenId";
const PAGE_INFO: &str = "pageInfo { hasNextPage endCursor }";

fn terminal_selection(feed: TerminalFeed, page_size: Option<u32>) -> String {
    match page_size {
        None => format!(
            "{} {{ nodes {{ {} }} }}",
            feed.connection(),
            TERMINAL_FIELDS
        ),
        Some(n) => format!(
            "{}(first: {}) {{ nodes {{ {} }} {} }}",
            feed.connection(),
            n,
            TERMINAL_FIELDS,
            PAGE_INFO
        ),
    }
}

/// The single query that returns the recent listings plus both terminal feeds.
pub fn recent_listings_query(opts: &QueryOptions) -> String {
    format!(
        "query GetRecentlyListedNFTs {{ \
         allItemListeds(first: {}, orderBy: [BLOCK_NUMBER_DESC, TX_INDEX_DESC, LOG_INDEX_DESC]) \
         {{ nodes {{ {} }} }} {} {} }}",
        opts.listed_limit,
        LISTED_FIELDS,
        terminal_selection(TerminalFeed::Bought, opts.terminal_page_size),
        terminal_selection(TerminalFeed::Canceled, opts.terminal_page_size),
    )
}

/// Follow-up query for one more page of a terminal feed. Takes `$after`.
pub fn terminal_page_query(feed: TerminalFeed, page_size: u32) -> String {
    format!(
        "query NextTerminalPage($after: Cursor) {{ {}(first: {}, after: $after) \
         {{ nodes {{ {} }} {} }} }}",
        feed.connection(),
        page_size,
        TERMINAL_FIELDS,
        PAGE_INFO
    )
}
