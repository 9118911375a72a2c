//! Feed poller for Feedhook.
//!
//! The scheduler periodically fans out one reconciliation per active
//! subscription. Each reconciliation fetches the feed, diffs it against the
//! delivery history and posts new entries to the subscription's webhook.

pub mod history;
pub mod reconciler;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use history::{DeliveryHistory, FeedKey, HistoryLimits, SeenSet};
pub use reconciler::{FeedReconciler, FirstSightPolicy, ReconcileOutcome};
pub use scheduler::{
    FeedScheduler, ScanReport, SchedulerHandle, DEFAULT_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL,
};
