//! Discord login handler.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::web::dto::{LoginRequest, MessageResponse};
use crate::web::error::ApiError;
use crate::web::middleware::ACCESS_TOKEN_COOKIE;
use crate::web::state::AppState;

/// POST /auth/discord/login - Log in with a Discord authorization code.
///
/// Creates the user record on first login and sets the session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let code = req.code.trim();
    if code.is_empty() {
        return Err(ApiError::bad_request("Authorization code is required"));
    }

    let identity = state.identity.identify(code).await.map_err(|e| {
        tracing::warn!("Discord login failed: {}", e);
        ApiError::internal("Internal server error")
    })?;

    let created = state
        .users
        .upsert_on_login(&identity.id, identity.username, identity.avatar_url)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %identity.id, "Failed to store user: {}", e);
            ApiError::internal("Internal server error")
        })?;
    if created {
        tracing::info!(user_id = %identity.id, "Registered new user");
    }

    let token = state.issue_token(&identity.id)?;

    // Browsers drop SameSite=None cookies that are not Secure.
    let same_site = if state.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    };
    let cookie = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(same_site);

    tracing::info!(user_id = %identity.id, "User logged in");
    Ok((jar.add(cookie), Json(MessageResponse::new("Login successful"))))
}
