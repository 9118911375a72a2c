//! User records and their subscriptions.
//!
//! Users are keyed by their Discord user ID. The store lives in memory and
//! can optionally be persisted to a JSON file between restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::subscription::{Subscription, SubscriptionSource, UserSubscription};
use crate::{FeedhookError, Result};

/// A user of the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Discord username.
    #[serde(default)]
    pub username: Option<String>,
    /// Avatar image URL.
    #[serde(default, rename = "pfp")]
    pub avatar_url: Option<String>,
    /// Feed subscriptions.
    #[serde(default)]
    pub feeds: Vec<Subscription>,
}

impl UserRecord {
    /// Create a user without subscriptions.
    pub fn new(username: Option<String>, avatar_url: Option<String>) -> Self {
        Self {
            username,
            avatar_url,
            feeds: Vec::new(),
        }
    }
}

/// In-memory user store.
#[derive(Debug, Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
    file: Option<PathBuf>,
    save_lock: Mutex<()>,
}

impl UserStore {
    /// Create an empty store without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted to `path`, loading it if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let users: HashMap<String, UserRecord> = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(FeedhookError::Io(e)),
        };
        info!("Loaded {} user(s) from {}", users.len(), path.display());

        Ok(Self {
            users: RwLock::new(users),
            file: Some(path),
            save_lock: Mutex::new(()),
        })
    }

    /// Get a user by ID.
    pub async fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }

    /// Number of users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store has no users.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Register a user on login.
    ///
    /// New users start with no feeds. Existing users keep their record
    /// untouched. Returns true when the user was created.
    pub async fn upsert_on_login(
        &self,
        user_id: &str,
        username: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<bool> {
        let created = {
            let mut users = self.users.write().await;
            if users.contains_key(user_id) {
                false
            } else {
                users.insert(user_id.to_string(), UserRecord::new(username, avatar_url));
                true
            }
        };
        if created {
            self.save().await?;
        }
        Ok(created)
    }

    /// Replace a user's subscriptions, returning the updated record.
    pub async fn replace_feeds(
        &self,
        user_id: &str,
        feeds: Vec<Subscription>,
    ) -> Result<UserRecord> {
        let record = {
            let mut users = self.users.write().await;
            let record = users
                .get_mut(user_id)
                .ok_or_else(|| FeedhookError::NotFound("user".to_string()))?;
            record.feeds = feeds;
            record.clone()
        };
        self.save().await?;
        Ok(record)
    }

    /// Write the store to its file, if it has one.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().await;

        let content = {
            let users = self.users.read().await;
            serde_json::to_string_pretty(&*users)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write then rename so a crash never leaves a truncated file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionSource for UserStore {
    async fn subscriptions(&self) -> Result<Vec<UserSubscription>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .flat_map(|(user_id, record)| {
                record
                    .feeds
                    .iter()
                    .map(move |feed| UserSubscription::new(user_id.clone(), feed.clone()))
            })
            .collect())
    }
}
