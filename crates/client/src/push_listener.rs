//! Push channel client.
//!
//! Keeps a websocket open to the server's `/ws` endpoint and merges every
//! notification into the local store. Reconnects with exponential backoff;
//! each new connection starts with a full snapshot.

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use mousedeck_core::PushMessage;

use crate::error::PushError;
use crate::queue::PendingQueue;
use crate::store::CatalogStore;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct PushListenerConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub ping_interval: Duration,
}

impl PushListenerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            ping_interval: Duration::from_secs(30),
        }
    }
}

pub struct PushListener {
    config: PushListenerConfig,
    store: Arc<CatalogStore>,
    queue: Arc<PendingQueue>,
    connected: watch::Sender<bool>,
}

impl PushListener {
    pub fn new(config: PushListenerConfig, store: Arc<CatalogStore>, queue: Arc<PendingQueue>) -> Self {
        let (connected, _) = watch::channel(false);
        Self {
            config,
            store,
            queue,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    /// Merge one notification into the store.
    pub async fn apply(&self, message: PushMessage) -> Result<(), PushError> {
        tracing::debug!(kind = message.kind(), "push received");
        let pending = self.queue.pending_ids().await;
        self.store.merge_push(message, &pending).await?;
        Ok(())
    }

    /// Connect, listen and reconnect until `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(url = %self.config.url, "push listener starting");
        let mut backoff = self.create_backoff();

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.connect_with_timeout().await {
                Ok(ws) => {
                    tracing::info!("push channel connected");
                    self.connected.send_replace(true);
                    backoff.reset();

                    let result = self.connection_loop(ws, &mut shutdown).await;
                    self.connected.send_replace(false);
                    match result {
                        Ok(()) if *shutdown.borrow() => break,
                        Ok(()) => tracing::info!("push channel closed by server"),
                        Err(e) => tracing::warn!(error = %e, "push channel lost"),
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "push channel connect failed");
                }
            }

            let Some(delay) = backoff.next_backoff() else {
                tracing::error!("push reconnect backoff exhausted");
                break;
            };
            tracing::debug!(?delay, "waiting before push reconnect");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.connected.send_replace(false);
        tracing::info!("push listener stopped");
    }

    async fn connect_with_timeout(&self) -> Result<WsStream, PushError> {
        match timeout(self.config.connect_timeout, connect_async(self.config.url.as_str())).await {
            Ok(Ok((ws, response))) => {
                tracing::debug!(status = ?response.status(), "websocket handshake complete");
                Ok(ws)
            }
            Ok(Err(e)) => Err(PushError::from(e)),
            Err(_) => Err(PushError::Timeout(self.config.connect_timeout)),
        }
    }

    async fn connection_loop(
        &self,
        ws: WsStream,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), PushError> {
        let (mut write, mut read) = ws.split();
        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ping_interval.tick().await;

        loop {
            tokio::select! {
                frame = read.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<PushMessage>(text.as_str()) {
                                Ok(message) => self.apply(message).await?,
                                Err(e) => tracing::warn!(error = %e, "unreadable push message"),
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            write.send(WsMessage::Pong(data)).await?;
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            tracing::debug!(?frame, "received close frame");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(PushError::from(e)),
                        None => return Ok(()),
                    }
                }
                _ = ping_interval.tick() => {
                    write.send(WsMessage::Ping(Vec::new().into())).await?;
                }
                _ = shutdown.changed() => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}
