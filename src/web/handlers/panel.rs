//! Panel handlers: read and replace a user's subscriptions.

use axum::{extract::State, Json};
use futures::future::join_all;
use std::sync::Arc;

use crate::subscription::Subscription;
use crate::users::UserRecord;
use crate::web::dto::{DataResponse, MessageDataResponse, UpdateFeedsRequest};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;
use crate::web::verify::{check_feed_shape, check_webhook_shape};

/// GET /panel/getdata - The authenticated user's record.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<DataResponse<UserRecord>>, ApiError> {
    let user = state
        .users
        .get(auth.user_id())
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(DataResponse::new(user)))
}

/// POST /panel/updatefeeds - Replace the authenticated user's subscriptions.
///
/// Every enabled feed is validated first. Nothing is saved if any check
/// fails.
pub async fn update_feeds(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<UpdateFeedsRequest>,
) -> Result<Json<MessageDataResponse<UserRecord>>, ApiError> {
    let user_id = auth.user_id();
    if state.users.get(user_id).await.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let errors: Vec<String> = join_all(
        req.feeds
            .iter()
            .enumerate()
            .map(|(i, feed)| validate_feed(&state, i + 1, feed)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    if !errors.is_empty() {
        tracing::debug!(user_id, errors = errors.len(), "Rejected feed update");
        return Err(ApiError::validation("feeds", errors));
    }

    let count = req.feeds.len();
    let user = state.users.replace_feeds(user_id, req.feeds).await?;
    tracing::info!(user_id, feeds = count, "Updated feeds");

    Ok(Json(MessageDataResponse {
        message: "Panel data updated successfully".to_string(),
        data: user,
    }))
}

/// Validation messages for the feed at 1-based `position`.
async fn validate_feed(state: &AppState, position: usize, feed: &Subscription) -> Vec<String> {
    if !feed.enabled {
        return Vec::new();
    }

    let webhook_url = feed.webhook_url.trim();
    let rss_url = feed.rss_url.trim();
    let (webhook_ok, feed_ok) = tokio::join!(
        async {
            if webhook_url.is_empty() {
                return None;
            }
            Some(
                check_webhook_shape(webhook_url).is_ok()
                    && (!state.verify_targets
                        || state.verifier.verify_webhook(webhook_url).await.is_ok()),
            )
        },
        async {
            if rss_url.is_empty() {
                return None;
            }
            Some(
                check_feed_shape(rss_url).is_ok()
                    && (!state.verify_targets
                        || state.verifier.verify_feed(rss_url).await.is_ok()),
            )
        },
    );

    let mut errors = Vec::new();
    match webhook_ok {
        None => errors.push(format!(
            "Feed {}: Webhook URL is required for enabled feeds",
            position
        )),
        Some(false) => errors.push(format!("Feed {}: Invalid Discord webhook URL", position)),
        Some(true) => {}
    }
    match feed_ok {
        None => errors.push(format!(
            "Feed {}: RSS feed URL is required for enabled feeds",
            position
        )),
        Some(false) => errors.push(format!("Feed {}: Invalid RSS feed URL", position)),
        Some(true) => {}
    }
    errors
}
