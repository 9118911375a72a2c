use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use feedhook::web::{AppState, DiscordOAuth, HttpTargetVerifier, WebServer};
use feedhook::{
    Config, DeliveryHistory, FeedReconciler, FeedScheduler, FirstSightPolicy, HistoryLimits,
    HttpFeedFetcher, HttpWebhookDispatcher, Result, UserStore,
};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }

    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feedhook::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feedhook::logging::init_console_only(&config.logging.level);
    }

    info!("Feedhook - RSS to Discord webhook notifier");

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let users = Arc::new(match &config.storage.users_file {
        Some(path) => UserStore::open(path).await?,
        None => UserStore::new(),
    });

    let client = feedhook::http::build_client(&config.poller)?;
    let fetcher = Arc::new(HttpFeedFetcher::with_client(
        client.clone(),
        config.poller.max_feed_size_bytes,
    ));
    let dispatcher = Arc::new(HttpWebhookDispatcher::with_client(client.clone()));
    let history = Arc::new(DeliveryHistory::new(HistoryLimits::from(&config.poller)));
    let reconciler = Arc::new(FeedReconciler::new(
        fetcher.clone(),
        dispatcher,
        history,
    ));

    let scheduler = if config.poller.enabled {
        let policy = FirstSightPolicy::from_send_latest(config.poller.send_latest_on_first_sight);
        let handle = FeedScheduler::new(users.clone(), reconciler)
            .with_interval(Duration::from_secs(config.poller.interval_secs))
            .with_policy(policy)
            .spawn();
        Some(handle)
    } else {
        warn!("Feed poller is disabled");
        None
    };

    let state = AppState::new(
        &config.web,
        users.clone(),
        Arc::new(DiscordOAuth::new(client.clone(), config.discord.clone())),
        Arc::new(HttpTargetVerifier::new(client, fetcher)),
    );
    let server = WebServer::new(&config.web, state)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                signal.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let served = server.run(shutdown.clone()).await;
    shutdown.cancel();

    if let Some(handle) = scheduler {
        handle.shutdown().await;
    }
    if let Err(e) = users.save().await {
        error!("Failed to save users: {}", e);
    }

    served
}
