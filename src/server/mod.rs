//! Webhook ingestion server.

pub mod webhook;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Hands an accepted issue off for background processing. Must not block.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, issue: u64);
}

pub struct AppState {
    /// Shared webhook secret; `None` disables signature checks
    pub secret: Option<String>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

pub type SharedState = Arc<AppState>;

/// Configuration for the webhook server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            secret: None,
        }
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/webhook", post(webhook::handle_webhook))
        .route("/health", get(webhook::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the webhook server and run until Ctrl-C.
pub async fn start_server(config: ServerConfig, dispatcher: Arc<dyn Dispatcher>) -> Result<()> {
    if config.secret.is_none() {
        warn!("GITHUB_WEBHOOK_SECRET not set - webhook signature verification disabled (INSECURE)");
    }

    let state = Arc::new(AppState {
        secret: config.secret,
        dispatcher,
    });
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Webhook listener running");
    println!("adw webhook listener running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutting down");
}
