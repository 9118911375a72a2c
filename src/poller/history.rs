//! Delivery history: which entries were already posted for a feed.
//!
//! One [`SeenSet`] per (user, feed URL). An identifier only enters a set
//! after its webhook post succeeded. Sets remember insertion order so that
//! pruning keeps exactly the most recently delivered identifiers.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::Mutex;

use crate::config::PollerConfig;

/// Key of one history record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    /// Owning user ID.
    pub user_id: String,
    /// Feed URL.
    pub feed_url: String,
}

impl FeedKey {
    /// Create a new key.
    pub fn new(user_id: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            feed_url: feed_url.into(),
        }
    }
}

/// Size bounds of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// A record larger than this is pruned.
    pub max_entries: usize,
    /// Number of identifiers kept by a prune.
    pub retain_entries: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            retain_entries: 500,
        }
    }
}

impl From<&PollerConfig> for HistoryLimits {
    fn from(config: &PollerConfig) -> Self {
        Self {
            max_entries: config.history_max_entries,
            retain_entries: config.history_retain_entries,
        }
    }
}

/// Insertion-ordered set of entry identifiers.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl SeenSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Insert `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    /// Number of identifiers.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Drop the oldest identifiers until at most `retain` remain.
    pub fn prune_to(&mut self, retain: usize) {
        while self.order.len() > retain {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    /// Identifiers from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn insert_bounded(&mut self, id: impl Into<String>, limits: HistoryLimits) -> bool {
        let inserted = self.insert(id);
        if self.len() > limits.max_entries {
            self.prune_to(limits.retain_entries);
        }
        inserted
    }
}

/// In-memory delivery history shared by concurrent reconciliations.
///
/// The lock is only held for map access, never across network calls.
#[derive(Debug, Default)]
pub struct DeliveryHistory {
    records: Mutex<HashMap<FeedKey, SeenSet>>,
    limits: HistoryLimits,
}

impl DeliveryHistory {
    /// Create an empty history with the given limits.
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            limits,
        }
    }

    /// Create an empty record for `key` unless one exists.
    ///
    /// Returns true when the record was created, i.e. the feed is being
    /// seen for the first time.
    pub async fn begin(&self, key: &FeedKey) -> bool {
        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return false;
        }
        records.insert(key.clone(), SeenSet::new());
        true
    }

    /// Whether a record exists for `key`.
    pub async fn has_record(&self, key: &FeedKey) -> bool {
        self.records.lock().await.contains_key(key)
    }

    /// Whether `id` was already delivered for `key`.
    pub async fn is_seen(&self, key: &FeedKey, id: &str) -> bool {
        self.records
            .lock()
            .await
            .get(key)
            .is_some_and(|set| set.contains(id))
    }

    /// Record a delivered identifier, pruning the record if it grew too large.
    pub async fn record(&self, key: &FeedKey, id: &str) {
        let limits = self.limits;
        let mut records = self.records.lock().await;
        records
            .entry(key.clone())
            .or_default()
            .insert_bounded(id, limits);
    }

    /// Record several identifiers at once, in the given order.
    ///
    /// Returns how many were newly added.
    pub async fn record_all<'a, I>(&self, key: &FeedKey, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let limits = self.limits;
        let mut records = self.records.lock().await;
        let set = records.entry(key.clone()).or_default();
        ids.into_iter()
            .filter(|id| set.insert_bounded(*id, limits))
            .count()
    }

    /// Number of identifiers recorded for `key`.
    pub async fn seen_count(&self, key: &FeedKey) -> usize {
        self.records.lock().await.get(key).map_or(0, SeenSet::len)
    }

    /// Copy of the identifiers recorded for `key`, oldest first.
    pub async fn seen_ids(&self, key: &FeedKey) -> Option<Vec<String>> {
        self.records
            .lock()
            .await
            .get(key)
            .map(|set| set.iter().map(str::to_string).collect())
    }

    /// Number of tracked feeds.
    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }
}
