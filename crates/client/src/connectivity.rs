//! Network and backend reachability.
//!
//! Two flags are tracked: whether the network is up at all (fed by the host
//! environment) and whether the backend answers a probe. The client is in
//! offline mode when either is down. Last-known flags are persisted so a
//! restart begins from the previous state.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::api::CatalogApi;
use crate::error::StorageError;
use crate::storage::{keys, load_json, save_json, LocalStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState {
    pub is_online: bool,
    pub is_server_up: bool,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            is_online: true,
            is_server_up: false,
        }
    }
}

impl ConnectivityState {
    pub fn is_offline_mode(&self) -> bool {
        !self.is_online || !self.is_server_up
    }
}

pub struct ConnectivityMonitor {
    api: Arc<dyn CatalogApi>,
    storage: Arc<dyn LocalStorage>,
    state: watch::Sender<ConnectivityState>,
    probe_interval: Duration,
}

impl ConnectivityMonitor {
    pub async fn load(
        api: Arc<dyn CatalogApi>,
        storage: Arc<dyn LocalStorage>,
        probe_interval: Duration,
    ) -> Result<Self, StorageError> {
        let initial: ConnectivityState = load_json(storage.as_ref(), keys::CONNECTIVITY)
            .await?
            .unwrap_or_default();
        let (state, _) = watch::channel(initial);
        Ok(Self {
            api,
            storage,
            state,
            probe_interval,
        })
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    async fn update(&self, next: ConnectivityState) -> Result<(), StorageError> {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::info!(
                is_online = next.is_online,
                is_server_up = next.is_server_up,
                offline_mode = next.is_offline_mode(),
                "connectivity changed"
            );
            save_json(self.storage.as_ref(), keys::CONNECTIVITY, &next).await?;
        }
        Ok(())
    }

    /// Network-level signal from the host. Going offline also marks the
    /// backend as down; coming back online triggers an immediate probe.
    pub async fn set_online(&self, online: bool) -> Result<ConnectivityState, StorageError> {
        if online {
            let mut next = self.state();
            next.is_online = true;
            self.update(next).await?;
            self.probe_once().await
        } else {
            let next = ConnectivityState {
                is_online: false,
                is_server_up: false,
            };
            self.update(next).await?;
            Ok(next)
        }
    }

    /// Probe the backend once and record the result.
    pub async fn probe_once(&self) -> Result<ConnectivityState, StorageError> {
        let mut next = self.state();
        next.is_server_up = next.is_online && self.api.probe().await;
        self.update(next).await?;
        Ok(next)
    }

    /// Probe periodically until `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.probe_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::debug!("connectivity monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.probe_once().await {
                        tracing::warn!(error = %e, "failed to persist connectivity state");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use mousedeck_core::{Mouse, MouseId, MousePatch, NewMouse};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Probe {
        up: AtomicBool,
    }

    #[async_trait]
    impl CatalogApi for Probe {
        async fn probe(&self) -> bool {
            self.up.load(Ordering::SeqCst)
        }
        async fn list_mice(&self) -> Result<Vec<Mouse>, ApiError> {
            Ok(vec![])
        }
        async fn create_mouse(&self, _: &NewMouse) -> Result<Mouse, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn update_mouse(&self, _: MouseId, _: &MousePatch) -> Result<Mouse, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn delete_mouse(&self, _: MouseId) -> Result<(), ApiError> {
            Err(ApiError::NotFound)
        }
    }

    #[tokio::test]
    async fn offline_mode_follows_both_flags() {
        let api = Arc::new(Probe::default());
        let storage = Arc::new(MemoryStorage::new());
        let monitor = ConnectivityMonitor::load(api.clone(), storage.clone(), Duration::from_secs(5))
            .await
            .unwrap();
        let mut rx = monitor.subscribe();
        assert!(monitor.state().is_offline_mode());

        api.up.store(true, Ordering::SeqCst);
        let state = monitor.probe_once().await.unwrap();
        assert!(!state.is_offline_mode());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        let state = monitor.set_online(false).await.unwrap();
        assert!(state.is_offline_mode());
        assert!(!state.is_server_up);

        // A probe while the network is down cannot bring the backend up.
        let state = monitor.probe_once().await.unwrap();
        assert!(!state.is_server_up);

        let state = monitor.set_online(true).await.unwrap();
        assert!(!state.is_offline_mode());
    }

    #[tokio::test]
    async fn last_known_state_is_restored() {
        let api = Arc::new(Probe::default());
        api.up.store(true, Ordering::SeqCst);
        let storage = Arc::new(MemoryStorage::new());
        let monitor = ConnectivityMonitor::load(api.clone(), storage.clone(), Duration::from_secs(5))
            .await
            .unwrap();
        monitor.probe_once().await.unwrap();
        drop(monitor);

        let restored = ConnectivityMonitor::load(api, storage, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(restored.state().is_server_up);
    }
}
