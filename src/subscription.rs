//! Subscriptions: which feed goes to which webhook.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One feed a user wants forwarded to a webhook.
///
/// Serialized in the camelCase shape the panel frontend uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Feed URL.
    #[serde(default)]
    pub rss_url: String,
    /// Destination webhook URL.
    #[serde(default)]
    pub webhook_url: String,
    /// Whether the feed is polled.
    #[serde(default)]
    pub enabled: bool,
    /// Display title chosen by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Subscription {
    /// Create an enabled subscription.
    pub fn new(rss_url: impl Into<String>, webhook_url: impl Into<String>) -> Self {
        Self {
            rss_url: rss_url.into(),
            webhook_url: webhook_url.into(),
            enabled: true,
            title: None,
        }
    }

    /// Set the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Disable the subscription.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the poller should process this subscription.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.rss_url.trim().is_empty() && !self.webhook_url.trim().is_empty()
    }
}

/// A subscription together with the user that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSubscription {
    /// Owning user ID.
    pub user_id: String,
    /// The subscription.
    pub subscription: Subscription,
}

impl UserSubscription {
    /// Pair a subscription with its owner.
    pub fn new(user_id: impl Into<String>, subscription: Subscription) -> Self {
        Self {
            user_id: user_id.into(),
            subscription,
        }
    }
}

/// Read-only view of every known subscription.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Snapshot of all (user, subscription) pairs.
    async fn subscriptions(&self) -> Result<Vec<UserSubscription>>;
}
