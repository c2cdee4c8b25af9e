//! Process bootstrap: storage selection, listener and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::app::{self, push::ConnectionRegistry, services::AppServices};
use crate::config::ApiConfig;

pub async fn run(config: ApiConfig) -> anyhow::Result<()> {
    info!("Initializing services...");
    let services = Arc::new(AppServices::from_config(&config).await?);
    let registry = services.registry().clone();

    let app = app::build_app(services);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// Clearing the registry ends every open push connection so the graceful
/// shutdown is not held up by long-lived sockets.
async fn shutdown_signal(registry: ConnectionRegistry) {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    let closed = registry.clear();
    info!(connections = closed, "closed push connections");
}
