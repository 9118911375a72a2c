//! Router configuration for the panel API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{get_data, login, update_feeds};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};
use super::state::AppState;

/// Create the main router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let auth_routes = Router::new().route("/discord/login", post(login));

    let panel_routes = Router::new()
        .route("/getdata", get(get_data))
        .route("/updatefeeds", post(update_feeds));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .route("/", get(root))
        .nest("/auth", auth_routes)
        .nest("/panel", panel_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/health", get(health_check))
}

async fn root() -> &'static str {
    "Up and running!"
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
