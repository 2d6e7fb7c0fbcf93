//! Case Room API server entry point.

use std::error::Error;
use std::net::SocketAddr;

use caseroom_api::config::AppConfig;
use caseroom_api::state::AppState;
use caseroom_api::{routes, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Read configuration from environment.
    let config = AppConfig::from_env()?;

    // Initialize tracing subscriber.
    let telemetry = telemetry::init(&config)?;

    tracing::info!("Starting Case Room API server");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;

    // Build application state and router.
    let app_state = AppState::from_config(config)?;
    let app = routes::app(app_state);

    // Start server.
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    telemetry.shutdown();
    Ok(())
}
