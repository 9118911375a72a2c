//! Feed types for Feedhook.

/// Title used when neither the feed nor the subscription provides one.
pub const DEFAULT_FEED_TITLE: &str = "RSS Feed";

/// One item of a fetched feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// RSS guid or Atom id.
    pub guid: Option<String>,
    /// Link to the original article.
    pub link: Option<String>,
    /// Item title.
    pub title: Option<String>,
    /// Item description or summary.
    pub description: Option<String>,
}

impl FeedEntry {
    /// Create an entry with only a guid.
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: Some(guid.into()),
            ..Self::default()
        }
    }

    /// Set the link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Identifier used to decide whether this entry was already delivered.
    ///
    /// The first non-empty of guid, link and title. Entries with none of
    /// them cannot be tracked and return `None`.
    pub fn identifier(&self) -> Option<&str> {
        [&self.guid, &self.link, &self.title]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|value| !value.trim().is_empty())
    }
}

/// Result of one successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Feed-level title.
    pub title: Option<String>,
    /// Entries in document order, newest first.
    pub entries: Vec<FeedEntry>,
}

impl FeedSnapshot {
    /// Create a snapshot.
    pub fn new(title: Option<String>, entries: Vec<FeedEntry>) -> Self {
        Self { title, entries }
    }

    /// The most recent entry, if any.
    pub fn latest(&self) -> Option<&FeedEntry> {
        self.entries.first()
    }

    /// Display title: the feed's own title, then `fallback`, then
    /// [`DEFAULT_FEED_TITLE`].
    pub fn display_title(&self, fallback: Option<&str>) -> String {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(fallback.filter(|t| !t.trim().is_empty()))
            .unwrap_or(DEFAULT_FEED_TITLE)
            .to_string()
    }
}
