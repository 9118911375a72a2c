//! Configuration module for Feedhook.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedhookError, Result};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file. Console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Feed poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Whether the background poller runs.
    #[serde(default = "default_poller_enabled")]
    pub enabled: bool,
    /// Seconds between the start of one scan and the next.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Announce the newest entry when a feed is seen for the first time.
    #[serde(default = "default_send_latest")]
    pub send_latest_on_first_sight: bool,
    /// History size that triggers pruning.
    #[serde(default = "default_history_max")]
    pub history_max_entries: usize,
    /// Number of identifiers kept after pruning.
    #[serde(default = "default_history_retain")]
    pub history_retain_entries: usize,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_poller_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_send_latest() -> bool {
    true
}

fn default_history_max() -> usize {
    1000
}

fn default_history_retain() -> usize {
    500
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    "Feedhook/0.1 (RSS to Discord)".to_string()
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: default_poller_enabled(),
            interval_secs: default_poll_interval(),
            send_latest_on_first_sight: default_send_latest(),
            history_max_entries: default_history_max(),
            history_retain_entries: default_history_retain(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
        }
    }
}

/// Web panel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the panel API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key.
    #[serde(default)]
    pub jwt_secret: String,
    /// Session token lifetime in minutes.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_minutes: u64,
    /// Set the Secure attribute on the session cookie.
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
    /// Probe webhook and feed URLs when subscriptions are saved.
    #[serde(default = "default_verify_targets")]
    pub verify_targets: bool,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_token_expiry() -> u64 {
    60 * 24 * 7 // 7 days
}

fn default_cookie_secure() -> bool {
    true
}

fn default_verify_targets() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            token_expiry_minutes: default_token_expiry(),
            cookie_secure: default_cookie_secure(),
            verify_targets: default_verify_targets(),
        }
    }
}

/// Discord OAuth configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    /// OAuth application client ID.
    #[serde(default)]
    pub client_id: String,
    /// OAuth application client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URI registered with the application.
    #[serde(default)]
    pub redirect_uri: String,
    /// Base URL of the Discord REST API.
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
    /// Base URL of the Discord CDN (avatars).
    #[serde(default = "default_discord_cdn_base")]
    pub cdn_base: String,
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_discord_cdn_base() -> String {
    "https://cdn.discordapp.com".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            api_base: default_discord_api_base(),
            cdn_base: default_discord_cdn_base(),
        }
    }
}

/// User store configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// JSON file the user records are loaded from and saved to.
    #[serde(default)]
    pub users_file: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Poller configuration.
    #[serde(default)]
    pub poller: PollerConfig,
    /// Web panel configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Discord OAuth configuration.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// User store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedhookError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedhookError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SECRET_KEY`: JWT signing secret
    /// - `DISCORD_CLIENT_ID`, `DISCORD_CLIENT_SECRET`, `DISCORD_REDIRECT_URI`
    /// - `ORIGINS`: comma-separated list of CORS origins
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_env("SECRET_KEY") {
            self.web.jwt_secret = secret;
        }
        if let Some(id) = non_empty_env("DISCORD_CLIENT_ID") {
            self.discord.client_id = id;
        }
        if let Some(secret) = non_empty_env("DISCORD_CLIENT_SECRET") {
            self.discord.client_secret = secret;
        }
        if let Some(uri) = non_empty_env("DISCORD_REDIRECT_URI") {
            self.discord.redirect_uri = uri;
        }
        if let Some(origins) = non_empty_env("ORIGINS") {
            self.web.cors_origins = parse_origins(&origins);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.poller.interval_secs == 0 {
            return Err(FeedhookError::Config(
                "poller.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.poller.history_retain_entries == 0 {
            return Err(FeedhookError::Config(
                "poller.history_retain_entries must be greater than zero".to_string(),
            ));
        }
        if self.poller.history_retain_entries > self.poller.history_max_entries {
            return Err(FeedhookError::Config(
                "poller.history_retain_entries must not exceed poller.history_max_entries"
                    .to_string(),
            ));
        }
        if self.web.jwt_secret.is_empty() {
            return Err(FeedhookError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via the SECRET_KEY environment variable."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
