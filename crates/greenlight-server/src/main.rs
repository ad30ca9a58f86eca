//! Verification Server Binary
//!
//! Runs the greenlight HTTP server: initial trust synchronization,
//! background refresh task, then the axum API.

use std::env;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use greenlight_server::trust::{refresh_policy, refresh_trust, spawn_refresh_task};
use greenlight_server::{create_router, AppState, AuthorityFeed, HttpFeed, ServerConfig, TrustContext};

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("GREENLIGHT_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = ServerConfig::from_env();

    let feed: Arc<dyn AuthorityFeed> = Arc::new(
        HttpFeed::new(&config.base_url, config.http_timeout, config.http_retries)
            .expect("Failed to build authority feed client"),
    );

    // Initial synchronization is fail-fast: the server cannot safely
    // verify credentials without a trust snapshot and a revocation set.
    info!(base_url = %config.base_url, "synchronizing trust material");
    let trust = refresh_trust(feed.as_ref())
        .await
        .expect("Initial trust synchronization failed");
    let policy = refresh_policy(feed.as_ref())
        .await
        .expect("Initial settings synchronization failed");

    let context = Arc::new(TrustContext::new(trust, policy));

    // Background refresh, stopped at shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_task = spawn_refresh_task(
        context.clone(),
        feed,
        config.refresh_interval,
        shutdown_rx,
    );

    let state = Arc::new(AppState {
        context,
        config: config.clone(),
    });
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(
        addr = %addr,
        refresh_interval_secs = config.refresh_interval.as_secs(),
        add_holder_details = config.add_holder_details,
        "greenlight ready for requests"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for shutdown signal");
            info!("shutdown signal received");
        })
        .await
        .expect("Server error");

    shutdown_tx.send(true).ok();
    refresh_task.await.ok();
}
