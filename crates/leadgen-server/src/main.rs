use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use leadgen_core::ScraperConfig;
use leadgen_server::background::spawn_sync_tasks;
use leadgen_server::routes;
use leadgen_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadgen=info".parse()?))
        .with_target(false)
        .init();

    let config = ScraperConfig::from_env()?;
    if config.serp_api_key.is_none() {
        tracing::warn!("SERP_API not set, /search will answer with a configuration error");
    }
    let addr = format!("0.0.0.0:{}", config.port);

    let cancel_token = CancellationToken::new();
    let background = spawn_sync_tasks(&config, cancel_token.clone())?;

    let state = Arc::new(AppState::from_config(config)?);
    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel_token.cancel();
    for handle in background {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
