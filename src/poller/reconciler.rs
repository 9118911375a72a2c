//! Per-subscription reconciliation.
//!
//! One pass fetches the feed, diffs its entries against the delivery
//! history and posts the new ones. History is only updated after a
//! successful post, so a failed post is retried on the next pass.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::feed::{FeedFetcher, FeedSnapshot};
use crate::poller::history::{DeliveryHistory, FeedKey};
use crate::subscription::Subscription;
use crate::webhook::{Notification, WebhookDispatcher};

/// What to do when a (user, feed) pair is seen for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstSightPolicy {
    /// Announce the feed, then deliver every entry in the snapshot.
    WelcomeOnly,
    /// Announce the feed, mark the whole snapshot as delivered and post
    /// only the newest entry.
    WelcomeAndLatest,
}

impl FirstSightPolicy {
    /// Policy matching the `send_latest_on_first_sight` setting.
    pub fn from_send_latest(send_latest: bool) -> Self {
        if send_latest {
            Self::WelcomeAndLatest
        } else {
            Self::WelcomeOnly
        }
    }
}

/// Result of reconciling one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Disabled or incomplete subscription; nothing was done.
    Skipped,
    /// The feed could not be fetched; nothing changed.
    FetchFailed,
    /// First sight of the feed under [`FirstSightPolicy::WelcomeAndLatest`].
    Initialized {
        /// Whether the welcome message was delivered.
        welcomed: bool,
        /// Whether the newest entry was delivered.
        latest_sent: bool,
        /// Identifiers marked as delivered without a post.
        marked: usize,
    },
    /// Steady-state pass.
    Delivered {
        /// Entries posted and recorded.
        sent: usize,
        /// Entries whose post failed; retried next pass.
        failed: usize,
    },
}

/// Brings one subscription's webhook up to date with its feed.
pub struct FeedReconciler {
    fetcher: Arc<dyn FeedFetcher>,
    dispatcher: Arc<dyn WebhookDispatcher>,
    history: Arc<DeliveryHistory>,
}

impl FeedReconciler {
    /// Create a new reconciler.
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        dispatcher: Arc<dyn WebhookDispatcher>,
        history: Arc<DeliveryHistory>,
    ) -> Self {
        Self {
            fetcher,
            dispatcher,
            history,
        }
    }

    /// The delivery history this reconciler writes to.
    pub fn history(&self) -> &Arc<DeliveryHistory> {
        &self.history
    }

    /// Reconcile one subscription owned by `user_id`.
    pub async fn reconcile(
        &self,
        user_id: &str,
        subscription: &Subscription,
        policy: FirstSightPolicy,
    ) -> ReconcileOutcome {
        if !subscription.is_active() {
            return ReconcileOutcome::Skipped;
        }

        let feed_url = subscription.rss_url.as_str();
        let snapshot = match self.fetcher.fetch(feed_url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(user_id, feed_url, "Failed to fetch feed: {}", e);
                return ReconcileOutcome::FetchFailed;
            }
        };

        let key = FeedKey::new(user_id, feed_url);
        if self.history.begin(&key).await {
            let feed_title = snapshot.display_title(subscription.title.as_deref());
            info!(user_id, feed_url, "New feed \"{}\" detected", feed_title);

            let welcomed = self
                .send(subscription, &Notification::welcome(&feed_title))
                .await;

            if policy == FirstSightPolicy::WelcomeAndLatest {
                return self
                    .initialize(&key, subscription, &snapshot, &feed_title, welcomed)
                    .await;
            }
        }

        self.deliver_new(&key, subscription, &snapshot).await
    }

    /// Mark the whole snapshot as delivered and post only its newest entry.
    async fn initialize(
        &self,
        key: &FeedKey,
        subscription: &Subscription,
        snapshot: &FeedSnapshot,
        feed_title: &str,
        welcomed: bool,
    ) -> ReconcileOutcome {
        // Oldest first, so a prune keeps the newest identifiers.
        let marked = self
            .history
            .record_all(
                key,
                snapshot
                    .entries
                    .iter()
                    .rev()
                    .filter_map(|entry| entry.identifier()),
            )
            .await;

        let latest_sent = match snapshot.latest() {
            Some(latest) => {
                self.send(subscription, &Notification::latest(feed_title, latest))
                    .await
            }
            None => false,
        };

        ReconcileOutcome::Initialized {
            welcomed,
            latest_sent,
            marked,
        }
    }

    /// Post every entry not yet in the history, in snapshot order.
    async fn deliver_new(
        &self,
        key: &FeedKey,
        subscription: &Subscription,
        snapshot: &FeedSnapshot,
    ) -> ReconcileOutcome {
        let mut sent = 0;
        let mut failed = 0;

        for entry in &snapshot.entries {
            let Some(id) = entry.identifier() else {
                continue;
            };
            if self.history.is_seen(key, id).await {
                continue;
            }

            if self.send(subscription, &Notification::entry(entry)).await {
                self.history.record(key, id).await;
                sent += 1;
            } else {
                failed += 1;
            }
        }

        if sent > 0 || failed > 0 {
            info!(
                user_id = %key.user_id,
                feed_url = %key.feed_url,
                "Delivered {} new entr{} ({} failed)",
                sent,
                if sent == 1 { "y" } else { "ies" },
                failed
            );
        } else {
            debug!(user_id = %key.user_id, feed_url = %key.feed_url, "No new entries");
        }

        ReconcileOutcome::Delivered { sent, failed }
    }

    async fn send(&self, subscription: &Subscription, notification: &Notification) -> bool {
        match self
            .dispatcher
            .dispatch(&subscription.webhook_url, notification)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    feed_url = %subscription.rss_url,
                    "Failed to send \"{}\" to webhook: {}",
                    notification.title,
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedEntry;
    use crate::poller::history::HistoryLimits;
    use crate::poller::testing::{numbered_feed, FakeDispatcher, FakeFetcher};
    use crate::webhook::{COLOR_ENTRY, COLOR_LATEST, COLOR_WELCOME};
    use std::sync::atomic::Ordering;

    const FEED: &str = "https://example.com/rss";
    const HOOK: &str = "https://discord.com/api/webhooks/x";

    struct Harness {
        fetcher: Arc<FakeFetcher>,
        dispatcher: Arc<FakeDispatcher>,
        reconciler: FeedReconciler,
    }

    fn harness() -> Harness {
        let fetcher = FakeFetcher::new();
        let dispatcher = FakeDispatcher::new();
        let reconciler = FeedReconciler::new(
            fetcher.clone(),
            dispatcher.clone(),
            Arc::new(DeliveryHistory::new(HistoryLimits::default())),
        );
        Harness {
            fetcher,
            dispatcher,
            reconciler,
        }
    }

    fn subscription() -> Subscription {
        Subscription::new(FEED, HOOK)
    }

    fn key() -> FeedKey {
        FeedKey::new("u1", FEED)
    }

    /// Reconcile once so the feed is past its first sight, then forget the
    /// deliveries that produced.
    async fn prime(h: &Harness) {
        h.fetcher.set(FEED, FeedSnapshot::default()).await;
        h.reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        h.dispatcher.clear().await;
    }

    #[tokio::test]
    async fn test_first_sight_single_entry_scenario() {
        let h = harness();
        let snapshot = FeedSnapshot::new(
            None,
            vec![FeedEntry::new("g1").with_title("Hello").with_link("https://x/1")],
        );
        h.fetcher.set(FEED, snapshot).await;

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Initialized {
                welcomed: true,
                latest_sent: true,
                marked: 1
            }
        );

        let sent = h.dispatcher.sent_to(HOOK).await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].color, COLOR_WELCOME);
        assert!(sent[0].description.contains("**RSS Feed**"));
        assert_eq!(sent[1].color, COLOR_LATEST);
        assert_eq!(sent[1].title, "🆕 Latest from RSS Feed: Hello");
        assert_eq!(sent[1].link, "https://x/1");
        assert_eq!(
            h.reconciler.history().seen_ids(&key()).await.unwrap(),
            vec!["g1".to_string()]
        );

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 0, failed: 0 });
        assert_eq!(h.dispatcher.sent_to(HOOK).await.len(), 2);
    }

    #[tokio::test]
    async fn test_first_sight_sends_two_regardless_of_size() {
        for n in [1, 5, 50] {
            let h = harness();
            h.fetcher.set(FEED, numbered_feed("Blog", n)).await;

            h.reconciler
                .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
                .await;

            let sent = h.dispatcher.sent().await;
            assert_eq!(sent.len(), 2, "feed with {n} entries");
            assert_eq!(sent[1].1.title, format!("🆕 Latest from Blog: Post {n}"));
            assert_eq!(h.reconciler.history().seen_count(&key()).await, n);
        }
    }

    #[tokio::test]
    async fn test_first_sight_uses_subscription_title_fallback() {
        let h = harness();
        h.fetcher.set(FEED, FeedSnapshot::new(None, vec![])).await;

        let outcome = h
            .reconciler
            .reconcile(
                "u1",
                &subscription().with_title("My Stored Title"),
                FirstSightPolicy::WelcomeAndLatest,
            )
            .await;

        assert_eq!(
            outcome,
            ReconcileOutcome::Initialized {
                welcomed: true,
                latest_sent: false,
                marked: 0
            }
        );
        let sent = h.dispatcher.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.description.contains("**My Stored Title**"));
    }

    #[tokio::test]
    async fn test_first_sight_welcome_only_delivers_everything() {
        let h = harness();
        h.fetcher.set(FEED, numbered_feed("Blog", 3)).await;

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeOnly)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 3, failed: 0 });

        let sent = h.dispatcher.sent().await;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].1.color, COLOR_WELCOME);
        let titles: Vec<_> = sent[1..].iter().map(|(_, n)| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 3", "Post 2", "Post 1"]);
    }

    #[tokio::test]
    async fn test_welcome_failure_is_not_retried() {
        let h = harness();
        h.fetcher.set(FEED, numbered_feed("Blog", 2)).await;
        h.dispatcher.fail_url(HOOK).await;

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(
            outcome,
            ReconcileOutcome::Initialized {
                welcomed: false,
                latest_sent: false,
                marked: 2
            }
        );

        h.dispatcher.heal().await;
        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 0, failed: 0 });
    }

    #[tokio::test]
    async fn test_new_entries_are_delivered_once() {
        let h = harness();
        prime(&h).await;
        h.fetcher.set(FEED, numbered_feed("Blog", 3)).await;

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 3, failed: 0 });

        let sent = h.dispatcher.sent_to(HOOK).await;
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|n| n.color == COLOR_ENTRY));
        for id in ["g1", "g2", "g3"] {
            assert!(h.reconciler.history().is_seen(&key(), id).await);
        }

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 0, failed: 0 });
        assert_eq!(h.dispatcher.attempts(), 3);
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_retried_next_pass() {
        let h = harness();
        prime(&h).await;
        h.fetcher.set(FEED, numbered_feed("Blog", 2)).await;
        h.dispatcher.fail_title("Post 2").await;

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 1, failed: 1 });
        assert!(!h.reconciler.history().is_seen(&key(), "g2").await);
        assert!(h.reconciler.history().is_seen(&key(), "g1").await);

        h.dispatcher.heal().await;
        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 1, failed: 0 });
        assert!(h.reconciler.history().is_seen(&key(), "g2").await);

        let titles: Vec<_> = h
            .dispatcher
            .sent()
            .await
            .into_iter()
            .map(|(_, n)| n.title)
            .collect();
        assert_eq!(titles, vec!["Post 1", "Post 2"]);
    }

    #[tokio::test]
    async fn test_identifier_fallback_chain() {
        let h = harness();
        prime(&h).await;
        let snapshot = FeedSnapshot::new(
            None,
            vec![
                FeedEntry::new("").with_link("https://x/link").with_title("Linked"),
                FeedEntry::default().with_title("Titled"),
                FeedEntry::new("").with_description("nothing to identify"),
            ],
        );
        h.fetcher.set(FEED, snapshot).await;

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::Delivered { sent: 2, failed: 0 });
        assert_eq!(
            h.reconciler.history().seen_ids(&key()).await.unwrap(),
            vec!["https://x/link".to_string(), "Titled".to_string()]
        );
        assert_eq!(h.dispatcher.attempts(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_changes_nothing() {
        let h = harness();

        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::FetchFailed);
        assert!(!h.reconciler.history().has_record(&key()).await);
        assert_eq!(h.dispatcher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_inactive_subscription_is_skipped() {
        let h = harness();
        h.fetcher.set(FEED, numbered_feed("Blog", 1)).await;

        for sub in [subscription().disabled(), Subscription::new(FEED, "")] {
            let outcome = h
                .reconciler
                .reconcile("u1", &sub, FirstSightPolicy::WelcomeAndLatest)
                .await;
            assert_eq!(outcome, ReconcileOutcome::Skipped);
        }
        assert_eq!(h.fetcher.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_history_is_per_user() {
        let h = harness();
        h.fetcher.set(FEED, numbered_feed("Blog", 1)).await;

        for user in ["u1", "u2"] {
            let outcome = h
                .reconciler
                .reconcile(user, &subscription(), FirstSightPolicy::WelcomeAndLatest)
                .await;
            assert!(matches!(outcome, ReconcileOutcome::Initialized { .. }));
        }
        assert_eq!(h.dispatcher.sent().await.len(), 4);
    }

    #[tokio::test]
    async fn test_feed_removed_from_fetcher_keeps_history() {
        let h = harness();
        h.fetcher.set(FEED, numbered_feed("Blog", 2)).await;
        h.reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;

        h.fetcher.remove(FEED).await;
        let outcome = h
            .reconciler
            .reconcile("u1", &subscription(), FirstSightPolicy::WelcomeAndLatest)
            .await;
        assert_eq!(outcome, ReconcileOutcome::FetchFailed);
        assert_eq!(h.reconciler.history().seen_count(&key()).await, 2);
    }

    #[test]
    fn test_policy_from_setting() {
        assert_eq!(
            FirstSightPolicy::from_send_latest(true),
            FirstSightPolicy::WelcomeAndLatest
        );
        assert_eq!(
            FirstSightPolicy::from_send_latest(false),
            FirstSightPolicy::WelcomeOnly
        );
    }
}
