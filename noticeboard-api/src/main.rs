//! # Noticeboard API Server
//!
//! Serves the public read API (notices, sliders, gallery), the admin API for
//! managing uploads, and the uploaded files themselves.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p noticeboard-api
//! ```

use anyhow::Context;
use noticeboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use noticeboard_shared::{
    auth::blacklist::{RedisTokenBlacklist, TokenBlacklist},
    db::{migrations, pool},
    redis::{client::sanitize_url, RedisClient, RedisConfig},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noticeboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Noticeboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to PostgreSQL")?;

    migrations::run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!(url = %sanitize_url(&config.redis.url), "Connecting to Redis");
    let redis = RedisClient::new(RedisConfig::with_url(config.redis.url.clone()))
        .await
        .context("Failed to connect to Redis")?;
    let blacklist: Arc<dyn TokenBlacklist> = Arc::new(RedisTokenBlacklist::new(redis));

    let bind_address = config.bind_address();
    let state = AppState::new(db.clone(), blacklist, config);

    state
        .uploads
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create upload directory {}", state.uploads.dir().display()))?;
    tracing::info!(dir = %state.uploads.dir().display(), "Upload directory ready");

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
