use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use mousedeck_client::push_listener::PushListenerConfig;
use mousedeck_client::{ClientConfig, HttpCatalogApi, OfflineClient, SqliteStorage, SyncEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mousedeck_observability::init();

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let storage = SqliteStorage::in_data_dir(config.data_dir.clone())?;
    info!(path = %storage.path().display(), api = %config.api_url, "starting client");

    let api = HttpCatalogApi::new(config.api_url.clone())?;
    let client = OfflineClient::open(
        Arc::new(api),
        Arc::new(storage),
        config.probe_interval,
        config.retry_interval,
    )
    .await
    .context("failed to restore local state")?;

    let state = client.monitor().probe_once().await?;
    info!(
        offline_mode = state.is_offline_mode(),
        cached = client.mice().await.len(),
        pending = client.pending_count().await,
        "local state restored"
    );

    let mut events = client.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::TerminalFailure { operation, reason }) => {
                    tracing::warn!(operation = %operation.id, kind = operation.kind().as_str(), %reason, "change could not be synced");
                }
                Ok(event) => tracing::debug!(?event, "sync event"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "sync events lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let handle = client.start(Some(PushListenerConfig::new(config.ws_url.clone())));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("shutting down");

    handle.shutdown().await;
    reporter.abort();
    info!(pending = client.pending_count().await, "client stopped");
    Ok(())
}
