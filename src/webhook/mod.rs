//! Webhook delivery for Feedhook.
//!
//! Builds Discord embed messages and posts them to webhook URLs.

pub mod dispatcher;
pub mod payload;

pub use dispatcher::{HttpWebhookDispatcher, WebhookDispatcher};
pub use payload::{
    Embed, Notification, WebhookMessage, COLOR_ENTRY, COLOR_LATEST, COLOR_WELCOME,
};
