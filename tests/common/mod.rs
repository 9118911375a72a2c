//! Test helpers for panel and poller integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;

use feedhook::config::WebConfig;
use feedhook::web::middleware::JwtState;
use feedhook::web::{create_router, AppState, DiscordIdentity, IdentityProvider, TargetVerifier};
use feedhook::{FeedhookError, Result, UserStore};

/// Secret used to sign session tokens in tests.
pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

/// Authorization code accepted by [`FakeIdentity`].
pub const GOOD_CODE: &str = "good-code";

/// Discord user ID returned for [`GOOD_CODE`].
pub const DISCORD_USER_ID: &str = "1001";

/// Web config for tests.
pub fn create_test_config() -> WebConfig {
    WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        jwt_secret: TEST_SECRET.to_string(),
        token_expiry_minutes: 60,
        cookie_secure: true,
        verify_targets: true,
    }
}

/// Identity provider that knows a single code.
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn identify(&self, code: &str) -> Result<DiscordIdentity> {
        if code == GOOD_CODE {
            Ok(DiscordIdentity {
                id: DISCORD_USER_ID.to_string(),
                username: Some("alice".to_string()),
                avatar_url: Some(format!(
                    "https://cdn.discordapp.com/avatars/{}/abc.png",
                    DISCORD_USER_ID
                )),
            })
        } else {
            Err(FeedhookError::OAuth("invalid_grant".to_string()))
        }
    }
}

/// Verifier that accepts webhooks ending in `/live` and feeds ending in `.xml`.
pub struct FakeVerifier;

#[async_trait]
impl TargetVerifier for FakeVerifier {
    async fn verify_webhook(&self, url: &str) -> Result<()> {
        if url.ends_with("/live") {
            Ok(())
        } else {
            Err(FeedhookError::Webhook("HTTP error: 404".to_string()))
        }
    }

    async fn verify_feed(&self, url: &str) -> Result<()> {
        if url.ends_with(".xml") {
            Ok(())
        } else {
            Err(FeedhookError::Feed("failed to parse feed".to_string()))
        }
    }
}

/// Create a test server with an in-memory user store.
pub fn create_test_server() -> (TestServer, Arc<UserStore>) {
    create_test_server_with(create_test_config())
}

/// Create a test server from `config`.
pub fn create_test_server_with(config: WebConfig) -> (TestServer, Arc<UserStore>) {
    let users = Arc::new(UserStore::new());
    let app_state = Arc::new(AppState::new(
        &config,
        users.clone(),
        Arc::new(FakeIdentity),
        Arc::new(FakeVerifier),
    ));
    let jwt_state = Arc::new(JwtState::new(&config.jwt_secret));

    let router = create_router(app_state, jwt_state, &config.cors_origins);
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, users)
}

/// Log in with [`GOOD_CODE`] and return the session token from the cookie.
pub async fn login(server: &TestServer) -> String {
    let response = server
        .post("/auth/discord/login")
        .json(&serde_json::json!({ "code": GOOD_CODE }))
        .await;
    response.assert_status_ok();

    let set_cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .expect("login sets a cookie")
        .to_str()
        .expect("cookie is ASCII")
        .to_string();
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("access_token="))
        .expect("access_token cookie")
        .to_string()
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
