use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use request_logger::api::routes::create_router;
use request_logger::{telemetry, Logger, LoggingConfig};

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = LoggingConfig::from_env();

    // Keep the guard until exit so file transports flush
    let _telemetry = telemetry::init(&config).context("Failed to initialize logging")?;

    info!(
        "Starting request logger demo v{}",
        env!("CARGO_PKG_VERSION")
    );

    let logger = Logger::new(&config).context("Failed to configure request logger")?;
    let app = create_router(&logger);

    let addr = std::env::var("API_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind server")?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}
