//! Request and response bodies of the panel API.

use serde::{Deserialize, Serialize};

use crate::subscription::Subscription;

/// Body of `POST /auth/discord/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// OAuth authorization code from the Discord redirect.
    #[serde(default)]
    pub code: String,
}

/// Body of `POST /panel/updatefeeds`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFeedsRequest {
    /// The user's complete new list of subscriptions.
    #[serde(default)]
    pub feeds: Vec<Subscription>,
}

/// Response wrapping a payload under `data`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    /// Payload.
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    /// Wrap a payload.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Response carrying a message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Create a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response carrying a message and a payload.
#[derive(Debug, Serialize)]
pub struct MessageDataResponse<T: Serialize> {
    /// Human-readable message.
    pub message: String,
    /// Payload.
    pub data: T,
}
