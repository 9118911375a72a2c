//! Feed fetcher.
//!
//! Downloads a feed document over HTTP and parses it with `feed-rs` into a
//! [`FeedSnapshot`]. Every failure mode (network, status, size, parse) is
//! reported as [`FeedhookError::Feed`] so callers can skip the cycle.

use std::net::IpAddr;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;

use crate::config::PollerConfig;
use crate::error::{FeedhookError, Result};
use crate::feed::types::{FeedEntry, FeedSnapshot};
use crate::http::build_client;

/// Source of feed snapshots.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot>;
}

/// Feed fetcher backed by `reqwest`.
pub struct HttpFeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl HttpFeedFetcher {
    /// Create a new fetcher from the poller settings.
    pub fn new(config: &PollerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Create a fetcher that shares an existing client.
    pub fn with_client(client: Client, max_feed_size: u64) -> Self {
        Self {
            client,
            max_feed_size,
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedhookError::Feed(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedhookError::Feed(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FeedhookError::Feed(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedhookError::Feed(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FeedhookError::Feed(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        parse_feed(&bytes)
    }
}

/// Parse an RSS or Atom document into a snapshot.
///
/// `feed-rs` normally synthesizes an id for items without a guid; that is
/// disabled here so the guid/link/title fallback sees the real document.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedSnapshot> {
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| FeedhookError::Feed(format!("failed to parse feed: {}", e)))?;

    let title = feed.title.map(|t| t.content);

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            guid: Some(entry.id).filter(|id| !id.is_empty()),
            link: article_link(&entry.links),
            title: entry.title.map(|t| t.content),
            description: entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body)),
        })
        .collect();

    Ok(FeedSnapshot::new(title, entries))
}

/// The entry's article link: the first `alternate` (or untyped) link,
/// else the first link of any kind.
fn article_link(links: &[feed_rs::model::Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
}

/// Validate a feed URL before it is stored.
///
/// Only http(s) URLs pointing at public hosts are accepted.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedhookError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedhookError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedhookError::Validation("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FeedhookError::Validation(format!(
                    "forbidden host: {}",
                    domain
                )));
            }
            return Ok(());
        }
        url::Host::Ipv4(ipv4) => IpAddr::V4(ipv4),
        url::Host::Ipv6(ipv6) => IpAddr::V6(ipv6),
    };

    if is_private_ip(&ip) {
        return Err(FeedhookError::Validation(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }

    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    let host_lower = host.to_lowercase();

    if host_lower == "localhost" {
        return true;
    }

    [".local", ".localhost", ".internal", ".intranet", ".lan"]
        .iter()
        .any(|suffix| host_lower.ends_with(suffix))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
                // Shared address space: 100.64.0.0/10
                || (octets[0] == 100 && (64..=127).contains(&octets[1]))
        }
        IpAddr::V6(ipv6) => {
            let segments = ipv6.segments();
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique local: fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}
