//! Feed fetching for Feedhook.
//!
//! Retrieves RSS/Atom documents and normalizes them into snapshots the
//! poller can diff against its delivery history.

pub mod fetcher;
pub mod types;

pub use fetcher::{parse_feed, validate_url, FeedFetcher, HttpFeedFetcher};
pub use types::{FeedEntry, FeedSnapshot, DEFAULT_FEED_TITLE};
