//! Main entry point for the KFServing Proxy

use kfserving_proxy::{
    api,
    config::Settings,
    server::{self, ShutdownSignal},
    AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    info!("Starting KFServing Proxy");

    settings.validate()?;
    info!(
        server = %format!("{}:{}", settings.server.host, settings.server.port),
        upstream_port = settings.upstream.port,
        model = %settings.upstream.model_name,
        color_mode = %settings.inference.color_mode,
        "Loaded configuration"
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let grace_period = settings.shutdown.grace_period();

    let shutdown = ShutdownSignal::new();
    server::watch_os_signals(shutdown.clone());

    // Create application state
    let app_state = Arc::new(AppState::from_settings(settings, shutdown.clone())?);
    info!(
        status = %app_state.routes.status(),
        infer = %app_state.routes.infer(),
        "Resolved upstream routes"
    );

    // Build the router
    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    server::serve(listener, app, shutdown, grace_period).await?;

    info!("Shutdown complete");
    Ok(())
}
