//! HTTP server entry point for the TRACER API.

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tracer_api::{cors_layer, create_router, AppState};
use tracer_core::config::TracerConfig;
use tracer_engine::CaseEngine;
use tracer_store::{open_repository, CaseRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();

    let config_prefix = std::env::var("TRACER_CONFIG").unwrap_or_else(|_| "tracer".to_string());
    let config = TracerConfig::load(&config_prefix)?;

    let repo = open_repository(&config.storage).await?;
    tracing::info!(
        backend = %repo.backend(),
        degraded = repo.is_degraded(),
        "Storage ready"
    );

    let engine = CaseEngine::new(repo).with_pivot_rule(config.analysis.pivot_rule);
    let app = create_router(AppState::new(engine)).layer(cors_layer(&config.api));

    let listener = TcpListener::bind(&config.api.bind_addr).await?;
    tracing::info!(addr = %config.api.bind_addr, "TRACER API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("TRACER API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
