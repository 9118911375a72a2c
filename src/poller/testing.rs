//! In-memory collaborators for poller tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{FeedhookError, Result};
use crate::feed::{FeedEntry, FeedFetcher, FeedSnapshot};
use crate::subscription::{SubscriptionSource, UserSubscription};
use crate::webhook::{Notification, WebhookDispatcher};

/// Serves canned snapshots by URL. Unknown URLs fail to fetch.
#[derive(Default)]
pub struct FakeFetcher {
    feeds: Mutex<HashMap<String, FeedSnapshot>>,
    panics_on: Mutex<HashSet<String>>,
    hangs_on: Mutex<HashSet<String>>,
    pub fetches: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set(&self, url: &str, snapshot: FeedSnapshot) {
        self.feeds.lock().await.insert(url.to_string(), snapshot);
    }

    pub async fn remove(&self, url: &str) {
        self.feeds.lock().await.remove(url);
    }

    pub async fn panic_on(&self, url: &str) {
        self.panics_on.lock().await.insert(url.to_string());
    }

    /// Fetches of `url` never complete.
    pub async fn hang_on(&self, url: &str) {
        self.hangs_on.lock().await.insert(url.to_string());
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.panics_on.lock().await.contains(url) {
            panic!("fetcher blew up for {url}");
        }
        if self.hangs_on.lock().await.contains(url) {
            std::future::pending::<()>().await;
        }
        self.feeds
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FeedhookError::Feed(format!("HTTP error: 404 for {url}")))
    }
}

/// Records every dispatch; fails for configured webhook URLs or titles.
#[derive(Default)]
pub struct FakeDispatcher {
    sent: Mutex<Vec<(String, Notification)>>,
    failing_urls: Mutex<HashSet<String>>,
    failing_titles: Mutex<HashSet<String>>,
    pub attempts: AtomicUsize,
}

impl FakeDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn fail_url(&self, url: &str) {
        self.failing_urls.lock().await.insert(url.to_string());
    }

    pub async fn fail_title(&self, title: &str) {
        self.failing_titles.lock().await.insert(title.to_string());
    }

    pub async fn heal(&self) {
        self.failing_urls.lock().await.clear();
        self.failing_titles.lock().await.clear();
    }

    /// Successful deliveries so far.
    pub async fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().await.clone()
    }

    /// Successful deliveries to one webhook.
    pub async fn sent_to(&self, url: &str) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
        self.attempts.store(0, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebhookDispatcher for FakeDispatcher {
    async fn dispatch(&self, webhook_url: &str, notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing_urls.lock().await.contains(webhook_url)
            || self.failing_titles.lock().await.contains(&notification.title)
        {
            return Err(FeedhookError::Webhook("HTTP error: 500".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((webhook_url.to_string(), notification.clone()));
        Ok(())
    }
}

/// Fixed list of subscriptions, optionally failing the first N calls.
#[derive(Default)]
pub struct FakeSource {
    subscriptions: Mutex<Vec<UserSubscription>>,
    failures_left: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(subscriptions: Vec<UserSubscription>) -> Arc<Self> {
        Arc::new(Self {
            subscriptions: Mutex::new(subscriptions),
            ..Self::default()
        })
    }

    pub fn failing_first(self: Arc<Self>, n: usize) -> Arc<Self> {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionSource for FakeSource {
    async fn subscriptions(&self) -> Result<Vec<UserSubscription>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(FeedhookError::Storage("user store unavailable".to_string()));
        }
        Ok(self.subscriptions.lock().await.clone())
    }
}

/// Snapshot with entries `g1..=gN`, newest (`gN`) first.
pub fn numbered_feed(title: &str, n: usize) -> FeedSnapshot {
    let entries = (1..=n)
        .rev()
        .map(|i| {
            FeedEntry::new(format!("g{i}"))
                .with_title(format!("Post {i}"))
                .with_link(format!("https://x/{i}"))
        })
        .collect();
    FeedSnapshot::new(Some(title.to_string()), entries)
}
