//! Checks run on subscription targets before they are saved.
//!
//! Shape checks are pure. Reachability probes go through a
//! [`TargetVerifier`] so they can be disabled or replaced.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{FeedhookError, Result};
use crate::feed::{validate_url, FeedFetcher};

/// Every Discord webhook URL starts with this prefix.
pub const DISCORD_WEBHOOK_PREFIX: &str = "https://discord.com/api/webhooks/";

/// Check that `url` looks like a Discord webhook.
pub fn check_webhook_shape(url: &str) -> Result<()> {
    if url.starts_with(DISCORD_WEBHOOK_PREFIX) && url.len() > DISCORD_WEBHOOK_PREFIX.len() {
        Ok(())
    } else {
        Err(FeedhookError::Validation(format!(
            "webhook URL must start with {}",
            DISCORD_WEBHOOK_PREFIX
        )))
    }
}

/// Check that `url` is an http(s) URL on a public host.
pub fn check_feed_shape(url: &str) -> Result<()> {
    validate_url(url)
}

/// Probes whether subscription targets are reachable.
#[async_trait]
pub trait TargetVerifier: Send + Sync {
    /// The webhook exists.
    async fn verify_webhook(&self, url: &str) -> Result<()>;

    /// The feed can be downloaded and parsed.
    async fn verify_feed(&self, url: &str) -> Result<()>;
}

/// Verifier that probes targets over HTTP.
pub struct HttpTargetVerifier {
    client: Client,
    fetcher: Arc<dyn FeedFetcher>,
}

impl HttpTargetVerifier {
    /// Create a verifier using `client` for webhooks and `fetcher` for feeds.
    pub fn new(client: Client, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self { client, fetcher }
    }
}

#[async_trait]
impl TargetVerifier for HttpTargetVerifier {
    async fn verify_webhook(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedhookError::Webhook(format!("webhook probe failed: {}", e)))?;

        // Discord answers GET on a live webhook with its metadata.
        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(FeedhookError::Webhook(format!(
                "webhook probe returned {}",
                response.status()
            )))
        }
    }

    async fn verify_feed(&self, url: &str) -> Result<()> {
        self.fetcher.fetch(url).await.map(|_| ())
    }
}
