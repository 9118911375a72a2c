//! Shared outbound HTTP client construction.

use std::time::Duration;

use reqwest::Client;

use crate::config::PollerConfig;
use crate::error::{FeedhookError, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Build the HTTP client used for feed fetches and webhook posts.
///
/// Every request made through it is bounded by the configured timeouts.
pub fn build_client(config: &PollerConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| FeedhookError::Config(format!("failed to create HTTP client: {}", e)))
}
