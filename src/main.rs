//! Event Feed - Binary Entry Point
//!
//! Serves the feed API over HTTP. Configuration comes from `FEED_*`
//! environment variables, log filtering from `RUST_LOG`.

use std::sync::Arc;

use event_feed::api::{create_router, AppState};
use event_feed::utils::cleanup_temp_files;
use event_feed::FeedConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FeedConfig::from_env();

    match cleanup_temp_files(&config.data_dir) {
        Ok(0) => {}
        Ok(n) => info!(removed = n, "Removed leftover temp files"),
        Err(e) => warn!(error = %e, "Could not clean up temp files"),
    }

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::from_config(config)?);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, version = event_feed::VERSION, "Event feed listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
