//! Shared state of the panel handlers.

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::WebConfig;
use crate::users::UserStore;
use crate::web::discord::IdentityProvider;
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;
use crate::web::verify::TargetVerifier;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// User records.
    pub users: Arc<UserStore>,
    /// Resolves OAuth codes to Discord accounts.
    pub identity: Arc<dyn IdentityProvider>,
    /// Probes webhook and feed URLs on save.
    pub verifier: Arc<dyn TargetVerifier>,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Session token lifetime in seconds.
    pub token_expiry_secs: u64,
    /// Set the Secure attribute on the session cookie.
    pub cookie_secure: bool,
    /// Run reachability probes when subscriptions are saved.
    pub verify_targets: bool,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: &WebConfig,
        users: Arc<UserStore>,
        identity: Arc<dyn IdentityProvider>,
        verifier: Arc<dyn TargetVerifier>,
    ) -> Self {
        Self {
            users,
            identity,
            verifier,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_expiry_secs: config.token_expiry_minutes * 60,
            cookie_secure: config.cookie_secure,
            verify_targets: config.verify_targets,
        }
    }

    /// Issue a session token for a user.
    pub fn issue_token(&self, user_id: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = JwtClaims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.token_expiry_secs,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Internal server error")
        })
    }
}
