//! Notification payloads and the Discord embed envelope.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::feed::FeedEntry;

/// Embed color for regular entry notifications.
pub const COLOR_ENTRY: u32 = 0x00ff00;

/// Embed color for the setup announcement.
pub const COLOR_WELCOME: u32 = 0x3498db;

/// Embed color for the first-sight "latest entry" notification.
pub const COLOR_LATEST: u32 = 0x9b59b6;

/// Discord rejects embed titles longer than this.
const MAX_EMBED_TITLE: usize = 256;

/// Discord rejects embed descriptions longer than this.
const MAX_EMBED_DESCRIPTION: usize = 4096;

const NO_TITLE: &str = "No Title";
const NO_DESCRIPTION: &str = "No Description";

/// Content of one notification, independent of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Link target; empty when there is none.
    pub link: String,
    /// Embed side color.
    pub color: u32,
}

impl Notification {
    /// Notification for a newly published entry.
    pub fn entry(entry: &FeedEntry) -> Self {
        Self {
            title: entry.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            link: entry.link.clone().unwrap_or_default(),
            color: COLOR_ENTRY,
        }
    }

    /// One-time announcement that a feed has been set up.
    pub fn welcome(feed_title: &str) -> Self {
        Self {
            title: "🎉 RSS Feed Bot Initialized!".to_string(),
            description: format!(
                "Your RSS feed **{}** has been successfully set up!\n\n\
                 I will start checking for updates in the next minute and notify you \
                 of any new posts. The first update will include the latest post from your feed.",
                feed_title
            ),
            link: String::new(),
            color: COLOR_WELCOME,
        }
    }

    /// The newest entry of a feed seen for the first time.
    pub fn latest(feed_title: &str, entry: &FeedEntry) -> Self {
        Self {
            title: format!(
                "🆕 Latest from {}: {}",
                feed_title,
                entry.title.as_deref().unwrap_or(NO_TITLE)
            ),
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            link: entry.link.clone().unwrap_or_default(),
            color: COLOR_LATEST,
        }
    }
}

/// A single Discord embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    /// Embed title, at most 256 characters.
    pub title: String,
    /// Embed body, at most 4096 characters.
    pub description: String,
    /// Link opened when the title is clicked.
    pub url: String,
    /// Sidebar color as 0xRRGGBB.
    pub color: u32,
    /// ISO-8601 UTC.
    pub timestamp: String,
}

/// Body of a Discord webhook execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    /// Embeds to post; always exactly one.
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    /// Wrap a notification in a single-embed message stamped with `at`.
    pub fn new(notification: &Notification, at: DateTime<Utc>) -> Self {
        Self {
            embeds: vec![Embed {
                title: truncate(&notification.title, MAX_EMBED_TITLE),
                description: truncate(&notification.description, MAX_EMBED_DESCRIPTION),
                url: notification.link.clone(),
                color: notification.color,
                timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }],
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
