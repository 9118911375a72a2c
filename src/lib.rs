//! Feedhook - RSS to Discord webhook notifier
//!
//! Polls RSS/Atom feeds on behalf of users and posts new entries to their
//! Discord webhooks. Users log in with Discord and manage their
//! subscriptions through a small web panel API.

pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod logging;
pub mod poller;
pub mod subscription;
pub mod users;
pub mod web;
pub mod webhook;

pub use config::Config;
pub use error::{FeedhookError, Result};
pub use feed::{FeedEntry, FeedFetcher, FeedSnapshot, HttpFeedFetcher};
pub use poller::{
    DeliveryHistory, FeedReconciler, FeedScheduler, FirstSightPolicy, HistoryLimits,
    ReconcileOutcome, ScanReport, SchedulerHandle,
};
pub use subscription::{Subscription, SubscriptionSource, UserSubscription};
pub use users::{UserRecord, UserStore};
pub use webhook::{HttpWebhookDispatcher, Notification, WebhookDispatcher};
