//! services/tracker/src/bin/tracker.rs

use presence_core::{RegionDescriptorStore, RegionRegistry, VisitRecordStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker_lib::{
    adapters::{JsonFileStore, SessionRoster, SystemClock, VolumeTable},
    config::Config,
    error::ServiceError,
    web::{router, AppState},
};

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting location tracker...");

    // --- 2. Initialize Adapters ---
    info!("Using data directory {}", config.data_dir.display());
    let store = Arc::new(JsonFileStore::new(config.data_dir.clone()));
    let roster = Arc::new(SessionRoster::new());
    let volumes = Arc::new(VolumeTable::new());

    // --- 3. Restore Persisted State ---
    let mut registry = RegionRegistry::new(
        RegionDescriptorStore::new(store.clone(), config.region_store_key.clone()),
        VisitRecordStore::new(store.clone(), config.visit_store_key.clone()),
        Arc::new(SystemClock),
        roster.clone(),
        volumes.clone(),
    );
    registry.startup().await?;

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(registry, roster, volumes));
    let app = router(app_state.clone());

    // --- 5. Start the Server ---
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_for_ctrl_c(shutdown.clone()));

    info!("Listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    // --- 6. Close Whatever Is Still Open ---
    let mut tracker = app_state.tracker.lock().await;
    let closed = tracker.close_all_sessions().await?;
    info!("Shutdown complete, {} session(s) closed", closed.len());

    Ok(())
}

async fn watch_for_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("Ctrl-C received, shutting down");
    shutdown.cancel();
}
