//! Offline-capable catalog client.
//!
//! Every mutation is validated, applied to the local store, and queued. The
//! sync engine delivers queued work whenever the backend is reachable, so
//! callers never need to know whether they are online.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use mousedeck_core::{Cart, EntityId, MousePatch, NewMouse, TempIdGenerator};

use crate::api::CatalogApi;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState};
use crate::error::{ClientError, StorageError};
use crate::push_listener::{PushListener, PushListenerConfig};
use crate::queue::PendingQueue;
use crate::storage::LocalStorage;
use crate::store::{CatalogStore, LocalMouse};
use crate::sync_engine::{SyncEngine, SyncEvent};
use crate::types::{PendingChange, PendingOperation};

pub struct OfflineClient {
    store: Arc<CatalogStore>,
    queue: Arc<PendingQueue>,
    monitor: Arc<ConnectivityMonitor>,
    engine: Arc<SyncEngine>,
    ids: TempIdGenerator,
    cart: Mutex<Cart>,
}

/// Background tasks started by [`OfflineClient::start`].
pub struct ClientHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl ClientHandle {
    /// Stop every background task and wait for them to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
    }
}

impl OfflineClient {
    /// Restore cached state from `storage`.
    pub async fn open(
        api: Arc<dyn CatalogApi>,
        storage: Arc<dyn LocalStorage>,
        probe_interval: Duration,
        retry_interval: Duration,
    ) -> Result<Self, StorageError> {
        let store = Arc::new(CatalogStore::load(storage.clone()).await?);
        let queue = Arc::new(PendingQueue::load(storage.clone()).await?);
        let monitor = Arc::new(ConnectivityMonitor::load(api.clone(), storage, probe_interval).await?);
        let engine = Arc::new(SyncEngine::new(
            queue.clone(),
            store.clone(),
            api,
            monitor.subscribe(),
            retry_interval,
        ));

        Ok(Self {
            store,
            queue,
            monitor,
            engine,
            ids: TempIdGenerator::new(),
            cart: Mutex::new(Cart::new()),
        })
    }

    /// Spawn the connectivity monitor, the sync engine and (when `push` is
    /// given) the push listener.
    pub fn start(&self, push: Option<PushListenerConfig>) -> ClientHandle {
        let (shutdown, rx) = watch::channel(false);
        let mut tasks = Vec::new();

        let monitor = self.monitor.clone();
        let monitor_rx = rx.clone();
        tasks.push(tokio::spawn(async move { monitor.run(monitor_rx).await }));

        let engine = self.engine.clone();
        let engine_rx = rx.clone();
        tasks.push(tokio::spawn(async move { engine.run(engine_rx).await }));

        if let Some(config) = push {
            let listener = PushListener::new(config, self.store.clone(), self.queue.clone());
            tasks.push(tokio::spawn(async move { listener.run(rx).await }));
        }

        ClientHandle { shutdown, tasks }
    }

    pub async fn add_mouse(&self, new: NewMouse) -> Result<LocalMouse, ClientError> {
        new.validate()?;
        let temp_id = self.ids.next_id();
        let local = LocalMouse::from_new(temp_id.clone(), &new);

        self.store.insert_local(local.clone()).await?;
        self.queue
            .enqueue(PendingChange::Add { temp_id, mouse: new })
            .await?;
        self.engine.nudge();
        Ok(local)
    }

    pub async fn update_mouse(
        &self,
        id: &EntityId,
        patch: MousePatch,
    ) -> Result<LocalMouse, ClientError> {
        patch.validate()?;
        let updated = self
            .store
            .apply_patch(id, &patch)
            .await?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;

        self.queue
            .enqueue(PendingChange::Update { id: updated.id.clone(), patch })
            .await?;
        self.engine.nudge();
        Ok(updated)
    }

    pub async fn delete_mouse(&self, id: &EntityId) -> Result<LocalMouse, ClientError> {
        let removed = self
            .store
            .remove(id)
            .await?
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;

        self.queue
            .enqueue(PendingChange::Delete { id: removed.id.clone() })
            .await?;
        self.engine.nudge();
        Ok(removed)
    }

    pub async fn mice(&self) -> Vec<LocalMouse> {
        self.store.list().await
    }

    pub async fn mouse(&self, id: &EntityId) -> Option<LocalMouse> {
        self.store.get(id).await
    }

    /// Pull the server catalog into the local cache.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        self.engine.refresh().await
    }

    pub async fn pending_operations(&self) -> Vec<PendingOperation> {
        self.queue.snapshot().await
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.len().await
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn is_syncing(&self) -> bool {
        self.engine.is_syncing()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.engine.subscribe()
    }

    /// Put one unit of a known mouse in the cart.
    pub async fn add_to_cart(&self, id: &EntityId) -> Result<Cart, ClientError> {
        let mouse = self
            .store
            .get(id)
            .await
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;
        let mut cart = self.cart.lock().await;
        cart.add(mouse.id, mouse.name, mouse.price);
        Ok(cart.clone())
    }

    pub async fn set_cart_quantity(&self, id: &EntityId, quantity: u32) -> Result<Cart, ClientError> {
        let id = self.store.resolve(id).await;
        let mut cart = self.cart.lock().await;
        self.follow_confirmed_ids(&mut cart).await;
        cart.update_quantity(&id, quantity)?;
        Ok(cart.clone())
    }

    pub async fn remove_from_cart(&self, id: &EntityId) -> Cart {
        let id = self.store.resolve(id).await;
        let mut cart = self.cart.lock().await;
        self.follow_confirmed_ids(&mut cart).await;
        cart.remove(&id);
        cart.clone()
    }

    /// Cart contents, with lines for since-confirmed records moved to their
    /// server ids.
    pub async fn cart(&self) -> Cart {
        let mut cart = self.cart.lock().await;
        self.follow_confirmed_ids(&mut cart).await;
        cart.clone()
    }

    async fn follow_confirmed_ids(&self, cart: &mut Cart) {
        let temps: Vec<EntityId> = cart
            .lines()
            .iter()
            .filter(|line| line.id.is_temporary())
            .map(|line| line.id.clone())
            .collect();
        for temp in temps {
            let resolved = self.store.resolve(&temp).await;
            if resolved != temp {
                cart.remap(&temp, &resolved);
            }
        }
    }
}
