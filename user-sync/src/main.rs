//! User sync web server.
//!
//! This binary:
//! - Receives signed user lifecycle webhooks from Clerk
//! - Verifies the Svix signature over the raw body
//! - Creates, updates or deletes the matching local user
//! - Tags newly created provider accounts with the local user id

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use usersync::web::{router, AppState, SvixVerifier};
use usersync::{ClerkClient, Config, DisabledProvider, IdentityProvider, MemoryUserStore, UserSync};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Missing secret is fatal before we ever bind
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        webhook_path = %config.webhook_path,
        signature_tolerance_secs = config.signature_tolerance_secs,
        clerk_api_configured = config.clerk_secret_key.is_some(),
        clerk_api_url = %config.clerk_api_url,
        "config_loaded"
    );

    let verifier = SvixVerifier::new(&config.webhook_secret, config.signature_tolerance_secs)
        .context("WEBHOOK_SECRET is not a valid signing secret")?;

    let provider: Arc<dyn IdentityProvider> = match &config.clerk_secret_key {
        Some(key) => {
            let client = Client::builder()
                .timeout(config.request_timeout())
                .build()
                .context("Failed to create HTTP client")?;
            Arc::new(ClerkClient::new(
                client,
                config.clerk_api_url.clone(),
                key.clone(),
            ))
        }
        None => {
            warn!("clerk_api_not_configured");
            Arc::new(DisabledProvider)
        }
    };

    let store = Arc::new(MemoryUserStore::new());
    let state = AppState::new(Arc::new(verifier), UserSync::new(store, provider));

    let app = router(state, &config.webhook_path);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
