use std::sync::Arc;
use ticket_priority::{
    api::{build_router, AppState},
    config::Config,
    observability::init_tracing,
    priority::{PriorityService, ServiceSettings},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.observability)?;

    tracing::info!("Starting ticket priority server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = ticket_priority::metrics::init_metrics() {
        tracing::warn!("Failed to initialize metrics: {}", e);
        tracing::warn!("Continuing without metrics");
    }

    // The model is loaded once and never mutated
    let service = PriorityService::load(
        &config.priority.model_path,
        ServiceSettings::from(&config.priority),
    )?;
    let app = build_router(AppState::new(Arc::new(service)));

    let http_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Predict: POST http://{}/predict", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Metrics: http://{}/metrics", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
