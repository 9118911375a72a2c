//! Polling scheduler.
//!
//! A single loop that, every interval, reconciles all active subscriptions
//! concurrently and waits for the whole scan before the next tick. The loop
//! stops when its cancellation token fires.

use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::poller::reconciler::{FeedReconciler, FirstSightPolicy, ReconcileOutcome};
use crate::subscription::{SubscriptionSource, UserSubscription};
use crate::Result;

/// Default poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Summary of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Subscriptions reconciled.
    pub subscriptions: usize,
    /// Feeds that could not be fetched.
    pub fetch_failures: usize,
    /// Feeds seen for the first time.
    pub initialized: usize,
    /// Entry notifications delivered.
    pub delivered: usize,
    /// Entry notifications that failed.
    pub failed: usize,
    /// Reconciliation tasks that panicked.
    pub crashed: usize,
}

impl ScanReport {
    fn add(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Skipped => {}
            ReconcileOutcome::FetchFailed => self.fetch_failures += 1,
            ReconcileOutcome::Initialized { .. } => self.initialized += 1,
            ReconcileOutcome::Delivered { sent, failed } => {
                self.delivered += sent;
                self.failed += failed;
            }
        }
    }
}

/// Periodic driver of [`FeedReconciler`].
pub struct FeedScheduler {
    source: Arc<dyn SubscriptionSource>,
    reconciler: Arc<FeedReconciler>,
    interval: Duration,
    policy: FirstSightPolicy,
}

impl FeedScheduler {
    /// Create a scheduler with the default interval that announces the
    /// newest entry of newly added feeds.
    pub fn new(source: Arc<dyn SubscriptionSource>, reconciler: Arc<FeedReconciler>) -> Self {
        Self {
            source,
            reconciler,
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            policy: FirstSightPolicy::WelcomeAndLatest,
        }
    }

    /// Set the poll interval, raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Set the first-sight policy.
    pub fn with_policy(mut self, policy: FirstSightPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The configured poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reconcile every active subscription once.
    ///
    /// Each subscription runs in its own task; a failing or panicking task
    /// does not affect the others. Dropping the returned future aborts the
    /// tasks still in flight.
    pub async fn scan(&self) -> Result<ScanReport> {
        let subscriptions = self.source.subscriptions().await?;

        let mut tasks = JoinSet::new();
        for UserSubscription {
            user_id,
            subscription,
        } in subscriptions
        {
            if !subscription.is_active() {
                continue;
            }
            let reconciler = Arc::clone(&self.reconciler);
            let policy = self.policy;
            tasks.spawn(async move {
                reconciler
                    .reconcile(&user_id, &subscription, policy)
                    .await
            });
        }

        let mut report = ScanReport {
            subscriptions: tasks.len(),
            ..ScanReport::default()
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.add(&outcome),
                Err(e) => {
                    error!("Feed reconciliation task failed: {}", e);
                    report.crashed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run until `token` is cancelled.
    ///
    /// The first scan starts immediately. A scan that outlasts the interval
    /// delays the next tick instead of overlapping with it. Cancellation
    /// abandons an in-flight scan.
    pub async fn run(self, token: CancellationToken) {
        info!(
            "Feed scheduler started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = timer.tick() => {}
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Abandoning in-flight feed scan");
                    break;
                }
                result = self.scan() => match result {
                    Ok(report) => {
                        debug!(
                            subscriptions = report.subscriptions,
                            delivered = report.delivered,
                            failed = report.failed,
                            fetch_failures = report.fetch_failures,
                            initialized = report.initialized,
                            "Feed scan finished"
                        );
                    }
                    Err(e) => error!("Feed scan failed: {}", e),
                },
            }
        }

        info!("Feed scheduler stopped");
    }

    /// Spawn the scheduler on the runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));
        SchedulerHandle { token, task }
    }
}

/// Control handle for a spawned [`FeedScheduler`].
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request the scheduler to stop.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether a stop was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the scheduler and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!("Feed scheduler task failed: {}", e);
        }
    }
}
