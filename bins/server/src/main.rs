//! Filegate API Server
//!
//! Main entry point for the Filegate file gateway.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filegate_api::{AppState, create_router};
use filegate_core::storage::{StorageRouter, StorageTarget, TransferSettings};
use filegate_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filegate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Build storage backends
    let targets: Vec<StorageTarget> = config
        .s3
        .iter()
        .map(StorageTarget::from)
        .chain(config.ftp.iter().map(StorageTarget::from))
        .collect();
    let settings = TransferSettings::from(&config.transfer);
    let storage = StorageRouter::from_targets(&targets, settings)
        .context("Failed to initialise storage backends")?;

    info!(
        backends = ?storage.configured(),
        chunk_size = settings.chunk_size,
        download_ttl_secs = settings.download_ttl.as_secs(),
        "Storage configured"
    );
    if config.server.max_upload_bytes.is_none() {
        warn!("No upload size limit configured");
    }

    // Create application state
    let state = AppState {
        storage: Arc::new(storage),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
