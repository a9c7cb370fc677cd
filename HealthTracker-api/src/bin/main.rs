use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use health_tracker_api::create_application;
use health_tracker_domain::clients::{CompletionClient, Summarizer};
use health_tracker_domain::config::AppConfig;
use health_tracker_domain::repository::Repositories;
use health_tracker_domain::services::create_services;

const DEFAULT_PORT: u16 = 3000;

/// Entry point for the HealthTracker API server.
///
/// Loads `.env`, installs the tracing subscriber, opens the configured
/// storage backend, wires the services and serves until Ctrl+C or SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stdout),
        )
        .with(env_filter)
        .init();

    info!("Starting HealthTracker API server");

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        "Using {:?} storage (delete policy: {})",
        config.database.db_type, config.database.delete_policy
    );

    let repositories = Repositories::from_config(&config.database).context("failed to open storage")?;

    let completion = CompletionClient::new(config.summarization).context("failed to build completion client")?;
    if !completion.is_configured() {
        warn!("No completion API key configured; summaries will use the fallback text");
    }

    let services = create_services(repositories, Arc::new(completion), config.aggregation);
    let app = create_application(services);

    let port = match std::env::var("PORT") {
        Ok(value) => value
            .parse::<u16>()
            .with_context(|| format!("PORT must be a number, got '{}'", value))?,
        Err(_) => DEFAULT_PORT,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down server...");
}
