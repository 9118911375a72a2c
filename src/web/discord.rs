//! Discord OAuth2 identity lookup.
//!
//! Exchanges an authorization code for an access token and reads the
//! authorizing user's profile.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::DiscordConfig;
use crate::error::{FeedhookError, Result};

/// A Discord account that completed the OAuth flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordIdentity {
    /// Discord user ID.
    pub id: String,
    /// Discord username.
    pub username: Option<String>,
    /// Avatar image URL, if the account has an avatar.
    pub avatar_url: Option<String>,
}

/// Resolves an OAuth authorization code to an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange `code` and look up the user behind it.
    async fn identify(&self, code: &str) -> Result<DiscordIdentity>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    avatar: Option<String>,
}

/// Identity provider talking to the Discord API.
pub struct DiscordOAuth {
    client: Client,
    config: DiscordConfig,
}

impl DiscordOAuth {
    /// Create a provider using the given client and application settings.
    pub fn new(client: Client, config: DiscordConfig) -> Self {
        Self { client, config }
    }

    fn avatar_url(&self, user: &DiscordUser) -> Option<String> {
        user.avatar
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .map(|hash| {
                format!(
                    "{}/avatars/{}/{}.png",
                    self.config.cdn_base.trim_end_matches('/'),
                    user.id,
                    hash
                )
            })
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let url = format!(
            "{}/oauth2/token",
            self.config.api_base.trim_end_matches('/')
        );
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| FeedhookError::OAuth(format!("token request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| FeedhookError::OAuth(format!("token request rejected: {}", e)))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FeedhookError::OAuth(format!("invalid token response: {}", e)))?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FeedhookError::OAuth("Failed to obtain Discord access token".to_string()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<DiscordUser> {
        let url = format!("{}/users/@me", self.config.api_base.trim_end_matches('/'));

        self.client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FeedhookError::OAuth(format!("user request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| FeedhookError::OAuth(format!("user request rejected: {}", e)))?
            .json()
            .await
            .map_err(|e| FeedhookError::OAuth(format!("invalid user response: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for DiscordOAuth {
    async fn identify(&self, code: &str) -> Result<DiscordIdentity> {
        let access_token = self.exchange_code(code).await?;
        let user = self.fetch_user(&access_token).await?;
        tracing::debug!(user_id = %user.id, "Resolved Discord identity");

        Ok(DiscordIdentity {
            avatar_url: self.avatar_url(&user),
            id: user.id,
            username: user.username,
        })
    }
}
