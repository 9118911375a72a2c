//! Webhook dispatcher.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::config::PollerConfig;
use crate::error::{FeedhookError, Result};
use crate::http::build_client;
use crate::webhook::payload::{Notification, WebhookMessage};

/// Sink for notifications.
///
/// A single attempt per call; retrying is left to the next polling cycle.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    /// Deliver `notification` to `webhook_url`.
    async fn dispatch(&self, webhook_url: &str, notification: &Notification) -> Result<()>;
}

/// Discord webhook dispatcher backed by `reqwest`.
pub struct HttpWebhookDispatcher {
    client: Client,
}

impl HttpWebhookDispatcher {
    /// Create a new dispatcher from the poller settings.
    pub fn new(config: &PollerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    /// Create a dispatcher that shares an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookDispatcher for HttpWebhookDispatcher {
    async fn dispatch(&self, webhook_url: &str, notification: &Notification) -> Result<()> {
        let message = WebhookMessage::new(notification, Utc::now());

        let response = self
            .client
            .post(webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| FeedhookError::Webhook(format!("failed to post webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedhookError::Webhook(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        Ok(())
    }
}
