//! Locally cached catalog with optimistic updates.
//!
//! Local edits are visible immediately. Server state arriving via push or
//! refresh never overwrites an entity that still has unconfirmed local
//! operations; the local version wins until the queue drains.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use mousedeck_core::{CategoryId, EntityId, Mouse, MouseId, MousePatch, NewMouse, PushMessage};

use crate::error::StorageError;
use crate::storage::{keys, load_json, save_json, LocalStorage};

/// A mouse as the client knows it. May not be confirmed by the server yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMouse {
    pub id: EntityId,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_generated: bool,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl LocalMouse {
    pub fn from_new(temp_id: EntityId, new: &NewMouse) -> Self {
        Self {
            id: temp_id,
            name: new.name.trim().to_string(),
            price: new.price,
            details: new.details.clone(),
            image: new.image.clone(),
            is_generated: new.is_generated,
            category_ids: new.category_ids.clone(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        !self.id.is_temporary()
    }

    pub fn apply(&mut self, patch: &MousePatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(details) = &patch.details {
            self.details = Some(details.clone());
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone());
        }
        if let Some(flag) = patch.is_generated {
            self.is_generated = flag;
        }
        if let Some(ids) = &patch.category_ids {
            self.category_ids = ids.clone();
        }
    }
}

impl From<Mouse> for LocalMouse {
    fn from(m: Mouse) -> Self {
        Self {
            id: EntityId::Server(m.id),
            name: m.name,
            price: m.price,
            details: m.details,
            image: m.image,
            is_generated: m.is_generated,
            category_ids: m.category_ids,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    mice: Vec<LocalMouse>,
    /// Temp ids that have been confirmed, for callers still holding them.
    /// Persisted, so a temp id stays resolvable across restarts.
    confirmed: HashMap<String, MouseId>,
}

impl StoreState {
    fn position(&self, id: &EntityId) -> Option<usize> {
        self.mice.iter().position(|m| &m.id == id)
    }

    fn upsert(&mut self, mouse: LocalMouse) {
        match self.position(&mouse.id) {
            Some(index) => self.mice[index] = mouse,
            None => self.mice.push(mouse),
        }
    }
}

pub struct CatalogStore {
    storage: Arc<dyn LocalStorage>,
    state: Mutex<StoreState>,
}

impl CatalogStore {
    pub async fn load(storage: Arc<dyn LocalStorage>) -> Result<Self, StorageError> {
        let mice: Vec<LocalMouse> = load_json(storage.as_ref(), keys::CACHED_MICE)
            .await?
            .unwrap_or_default();
        let confirmed: HashMap<String, MouseId> = load_json(storage.as_ref(), keys::CONFIRMED_IDS)
            .await?
            .unwrap_or_default();
        Ok(Self {
            storage,
            state: Mutex::new(StoreState { mice, confirmed }),
        })
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StorageError> {
        save_json(self.storage.as_ref(), keys::CACHED_MICE, &state.mice).await
    }

    pub async fn list(&self) -> Vec<LocalMouse> {
        self.state.lock().await.mice.clone()
    }

    pub async fn get(&self, id: &EntityId) -> Option<LocalMouse> {
        let state = self.state.lock().await;
        let id = resolve_in(&state, id);
        state.mice.iter().find(|m| m.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.mice.len()
    }

    /// Current id for `id`: the server id if it was a confirmed temp id.
    pub async fn resolve(&self, id: &EntityId) -> EntityId {
        resolve_in(&*self.state.lock().await, id)
    }

    pub async fn insert_local(&self, mouse: LocalMouse) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.upsert(mouse);
        self.persist(&state).await
    }

    /// Apply a patch optimistically. Returns the patched record, which
    /// carries the server id if `id` is a confirmed temp id.
    pub async fn apply_patch(
        &self,
        id: &EntityId,
        patch: &MousePatch,
    ) -> Result<Option<LocalMouse>, StorageError> {
        let mut state = self.state.lock().await;
        let id = resolve_in(&state, id);
        let Some(index) = state.position(&id) else {
            return Ok(None);
        };
        state.mice[index].apply(patch);
        let patched = state.mice[index].clone();
        self.persist(&state).await?;
        Ok(Some(patched))
    }

    pub async fn remove(&self, id: &EntityId) -> Result<Option<LocalMouse>, StorageError> {
        let mut state = self.state.lock().await;
        let id = resolve_in(&state, id);
        let Some(index) = state.position(&id) else {
            return Ok(None);
        };
        let removed = state.mice.remove(index);
        self.persist(&state).await?;
        Ok(Some(removed))
    }

    /// The server accepted the ADD for `temp_id`.
    ///
    /// The temp entity takes the server id. Its fields are replaced with the
    /// server's unless `keep_local` is set (more local edits are still queued).
    /// If a push already delivered the record under its server id, the two
    /// are collapsed into one.
    pub async fn reconcile(
        &self,
        temp_id: &EntityId,
        confirmed: Mouse,
        keep_local: bool,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let server_id = EntityId::Server(confirmed.id);

        if let EntityId::Temp(raw) = temp_id {
            state.confirmed.insert(raw.clone(), confirmed.id);
            save_json(self.storage.as_ref(), keys::CONFIRMED_IDS, &state.confirmed).await?;
        }

        let local = state.position(temp_id).map(|index| state.mice.remove(index));
        let Some(mut local) = local else {
            // Deleted locally while the ADD was in flight; the queued DELETE
            // will remove the server record.
            return Ok(());
        };

        let merged = if keep_local {
            local.id = server_id.clone();
            local
        } else {
            LocalMouse::from(confirmed)
        };

        match state.position(&server_id) {
            Some(index) => state.mice[index] = merged,
            None => state.mice.push(merged),
        }
        self.persist(&state).await
    }

    /// Overwrite with server state after a confirmed UPDATE.
    pub async fn upsert_confirmed(&self, mouse: Mouse) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        state.upsert(LocalMouse::from(mouse));
        self.persist(&state).await
    }

    /// Merge a push notification. Entities in `pending` are left alone.
    pub async fn merge_push(
        &self,
        message: PushMessage,
        pending: &HashSet<EntityId>,
    ) -> Result<(), StorageError> {
        match message {
            PushMessage::NewMouse { data, .. } | PushMessage::UpdatedMouse { data, .. } => {
                let id = EntityId::Server(data.id);
                if pending.contains(&id) {
                    tracing::debug!(%id, "ignoring push for entity with pending changes");
                    return Ok(());
                }
                let mut state = self.state.lock().await;
                state.upsert(LocalMouse::from(data));
                self.persist(&state).await
            }
            PushMessage::DeletedMouse { data, .. } => {
                let id = EntityId::Server(data.id);
                if pending.contains(&id) {
                    tracing::debug!(%id, "ignoring push for entity with pending changes");
                    return Ok(());
                }
                let mut state = self.state.lock().await;
                if let Some(index) = state.position(&id) {
                    state.mice.remove(index);
                    self.persist(&state).await?;
                }
                Ok(())
            }
            PushMessage::InitialData { data, .. } => self.replace_all(data, pending).await,
        }
    }

    /// Replace the cache with a server snapshot, keeping every entity that has
    /// pending local operations (including unconfirmed ones).
    pub async fn replace_all(
        &self,
        snapshot: Vec<Mouse>,
        pending: &HashSet<EntityId>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let kept: Vec<LocalMouse> = state
            .mice
            .iter()
            .filter(|m| pending.contains(&m.id))
            .cloned()
            .collect();

        // Locally deleted entities with a queued DELETE stay gone.
        let mut mice: Vec<LocalMouse> = snapshot
            .into_iter()
            .map(LocalMouse::from)
            .filter(|m| !pending.contains(&m.id))
            .collect();
        mice.extend(kept);

        state.mice = mice;
        self.persist(&state).await
    }
}

fn resolve_in(state: &StoreState, id: &EntityId) -> EntityId {
    match id {
        EntityId::Temp(raw) => state
            .confirmed
            .get(raw)
            .map(|server| EntityId::Server(*server))
            .unwrap_or_else(|| id.clone()),
        EntityId::Server(_) => id.clone(),
    }
}
