//! Dossier Server
//!
//! Serves the dossier form, runs uploaded screenshots through OCR and renders
//! the research prompt for manual copy.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dossier_server::config::Config;
use dossier_server::routes;
use dossier_server::session::secret_fingerprint;
use dossier_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "dossier_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting Dossier Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("OCR providers: {:?}", config.ocr.providers);
    tracing::debug!("Password fingerprint: {}", secret_fingerprint(&config.auth.password));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;
    let ttl = chrono::Duration::minutes(config.server.session_ttl_minutes);

    let app_state = AppState::new(config);

    tracing::info!("OCR languages: {}", app_state.ocr().languages());
    let available = app_state.ocr().available_providers().await;
    if available.is_empty() {
        tracing::warn!("No OCR provider is available; submissions will fail until one is");
    }

    // Connect once; the outcome is cached for the process lifetime
    if app_state.repository().is_configured() {
        app_state.repository().get().await;
    }

    // Purge idle sessions
    let sessions = app_state.sessions().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions.purge_expired(ttl).await;
        }
    });

    let app = routes::app(app_state);

    tracing::info!("Dossier Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
