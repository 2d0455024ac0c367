use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemImageStore;
use gateway::ContentGateway;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portal::config::AppConfig;
use portal::state::AppState;
use portal::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db).await?;
    seed::ensure_bootstrap_admin(&db, &config.auth)
        .await
        .context("Failed to create bootstrap admin")?;

    let images = FilesystemImageStore::new(
        config.storage.images_dir.clone(),
        config.storage.max_image_bytes,
    )
    .await
    .context("Failed to open image directory")?;
    let gateway =
        ContentGateway::from_config(&config.gateway).context("Failed to configure providers")?;

    let shutdown = CancellationToken::new();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        gateway: Arc::new(gateway),
        images: Arc::new(images),
        image_commits: Default::default(),
        shutdown: shutdown.clone(),
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("API docs at http://{}/scalar", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
