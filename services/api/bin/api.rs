//! Main Entrypoint for the Call Relay Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the call bridge around the OpenAI Realtime session factory.
//! 3. Constructing the Axum router.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use relay_api::{
    config::Config, router::create_router, state::AppState, ws::provider::OpenAiSessionFactory,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    if let Err(e) = config.check_api_key() {
        warn!(error = %e, "Calls will be refused until the OpenAI credential is fixed.");
    }

    // --- 3. Build Application State ---
    let sessions = Arc::new(OpenAiSessionFactory::new(config.realtime_url.clone()));
    let bind_address = config.bind_address;
    info!(
        agent = %config.agent_name,
        model = %config.realtime_model,
        voice = %config.agent_voice,
        %bind_address,
        "Service configured. Starting server..."
    );
    let app_state = Arc::new(AppState::new(config, sessions));

    // --- 4. Start Server ---
    let app = create_router(app_state);
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
