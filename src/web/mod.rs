//! Web panel for Feedhook.
//!
//! Discord OAuth login plus the endpoints the panel frontend uses to read
//! and replace a user's subscriptions.

pub mod discord;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod state;
pub mod verify;

pub use discord::{DiscordIdentity, DiscordOAuth, IdentityProvider};
pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
pub use state::AppState;
pub use verify::{HttpTargetVerifier, TargetVerifier, DISCORD_WEBHOOK_PREFIX};
