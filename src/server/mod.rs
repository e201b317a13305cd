/// Proxy route server - Gateway
mod error;
mod routes;

pub use error::ApiError;
pub use routes::{build_router, ServerState};

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::app::Config;
use crate::provider::GeminiProvider;

/// Bind and serve the proxy route until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let provider = GeminiProvider::new(&config.provider)?;
    let state = ServerState::new(Arc::new(provider), config.provider.api_key_env.clone());

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    if std::env::var(&config.provider.api_key_env).is_err() {
        // Not fatal: the key is read per request
        tracing::warn!(
            "{} is not set; chat requests will fail until it is",
            config.provider.api_key_env
        );
    }
    info!("Deep Search proxy listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            tracing::warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
