//! Durable FIFO of mutations that have been applied locally but not yet
//! confirmed by the server.
//!
//! The queue is rewritten to storage after every mutation. At most one
//! operation is in flight at a time; it stays in the queue until the sync
//! engine reports its outcome, and coalescing never touches it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use mousedeck_core::EntityId;

use crate::error::StorageError;
use crate::storage::{keys, load_json, save_json, LocalStorage};
use crate::types::{PendingChange, PendingOperation, MAX_RETRIES};

/// What `enqueue` did with a change.
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Appended(Uuid),
    /// Folded into an existing UPDATE for the same entity.
    Coalesced(Uuid),
    /// A DELETE that cancelled a not-yet-sent ADD. Nothing will be sent.
    Cancelled { removed: usize },
}

/// What happened to an operation after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    Requeued { retry_count: u32 },
    Dropped(PendingOperation),
}

#[derive(Debug, Default)]
struct QueueState {
    ops: Vec<PendingOperation>,
    in_flight: Option<Uuid>,
    /// Temp ids already remapped this session, to their server ids.
    aliases: HashMap<EntityId, EntityId>,
}

impl QueueState {
    fn is_idle(&self, op: &PendingOperation) -> bool {
        self.in_flight != Some(op.id)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.ops.iter().position(|op| op.id == id)
    }

    /// Point a change at the server id if its temp id was already confirmed.
    fn resolve(&self, mut change: PendingChange) -> PendingChange {
        if let Some(confirmed) = self.aliases.get(change.target()) {
            *change.target_mut() = confirmed.clone();
        }
        change
    }
}

pub struct PendingQueue {
    storage: Arc<dyn LocalStorage>,
    state: Mutex<QueueState>,
}

impl PendingQueue {
    /// Restore the queue from storage. Nothing is in flight after a restart.
    pub async fn load(storage: Arc<dyn LocalStorage>) -> Result<Self, StorageError> {
        let ops: Vec<PendingOperation> = load_json(storage.as_ref(), keys::PENDING_OPERATIONS)
            .await?
            .unwrap_or_default();
        if !ops.is_empty() {
            tracing::info!(pending = ops.len(), "restored pending operations");
        }
        Ok(Self {
            storage,
            state: Mutex::new(QueueState {
                ops,
                ..QueueState::default()
            }),
        })
    }

    async fn persist(&self, state: &QueueState) -> Result<(), StorageError> {
        save_json(self.storage.as_ref(), keys::PENDING_OPERATIONS, &state.ops).await
    }

    pub async fn enqueue(&self, change: PendingChange) -> Result<EnqueueOutcome, StorageError> {
        let mut state = self.state.lock().await;
        let change = state.resolve(change);

        let outcome = match change {
            PendingChange::Update { id, patch } => {
                let existing = state.ops.iter().position(|op| {
                    state.is_idle(op)
                        && matches!(&op.change, PendingChange::Update { id: other, .. } if *other == id)
                });
                match existing {
                    Some(index) => {
                        let op = &mut state.ops[index];
                        if let PendingChange::Update { patch: pending, .. } = &mut op.change {
                            pending.merge(patch);
                        }
                        EnqueueOutcome::Coalesced(op.id)
                    }
                    None => {
                        let op = PendingOperation::new(PendingChange::Update { id, patch });
                        let op_id = op.id;
                        state.ops.push(op);
                        EnqueueOutcome::Appended(op_id)
                    }
                }
            }
            PendingChange::Delete { id } => {
                let add_pending = state.ops.iter().any(|op| {
                    state.is_idle(op)
                        && matches!(&op.change, PendingChange::Add { temp_id, .. } if *temp_id == id)
                });
                if add_pending {
                    let in_flight = state.in_flight;
                    let before = state.ops.len();
                    state
                        .ops
                        .retain(|op| Some(op.id) == in_flight || op.target() != &id);
                    EnqueueOutcome::Cancelled {
                        removed: before - state.ops.len(),
                    }
                } else {
                    let op = PendingOperation::new(PendingChange::Delete { id });
                    let op_id = op.id;
                    state.ops.push(op);
                    EnqueueOutcome::Appended(op_id)
                }
            }
            add @ PendingChange::Add { .. } => {
                let op = PendingOperation::new(add);
                let op_id = op.id;
                state.ops.push(op);
                EnqueueOutcome::Appended(op_id)
            }
        };

        self.persist(&state).await?;
        tracing::debug!(?outcome, pending = state.ops.len(), "enqueued change");
        Ok(outcome)
    }

    /// Oldest operation, without removing it.
    pub async fn peek(&self) -> Option<PendingOperation> {
        self.state.lock().await.ops.first().cloned()
    }

    /// Mark the oldest operation as in flight and return a copy of it.
    pub async fn begin_next(&self) -> Option<PendingOperation> {
        let mut state = self.state.lock().await;
        let op = state.ops.first().cloned()?;
        state.in_flight = Some(op.id);
        Some(op)
    }

    /// Remove and return the oldest operation.
    pub async fn dequeue_front(&self) -> Result<Option<PendingOperation>, StorageError> {
        let mut state = self.state.lock().await;
        if state.ops.is_empty() {
            return Ok(None);
        }
        let op = state.ops.remove(0);
        if state.in_flight == Some(op.id) {
            state.in_flight = None;
        }
        self.persist(&state).await?;
        Ok(Some(op))
    }

    /// Remove an operation that the server has confirmed.
    pub async fn complete(&self, op_id: Uuid) -> Result<Option<PendingOperation>, StorageError> {
        self.remove(op_id).await
    }

    /// Remove an operation that can never succeed.
    pub async fn discard(&self, op_id: Uuid) -> Result<Option<PendingOperation>, StorageError> {
        self.remove(op_id).await
    }

    async fn remove(&self, op_id: Uuid) -> Result<Option<PendingOperation>, StorageError> {
        let mut state = self.state.lock().await;
        if state.in_flight == Some(op_id) {
            state.in_flight = None;
        }
        let Some(index) = state.position(op_id) else {
            return Ok(None);
        };
        let op = state.ops.remove(index);
        self.persist(&state).await?;
        Ok(Some(op))
    }

    /// Remove every operation that still targets `id`. Used when the ADD that
    /// introduced a temporary id has been dropped.
    pub async fn discard_targeting(
        &self,
        id: &EntityId,
    ) -> Result<Vec<PendingOperation>, StorageError> {
        let mut state = self.state.lock().await;
        let (doomed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.ops)
            .into_iter()
            .partition(|op| op.target() == id);
        state.ops = kept;
        if doomed.iter().any(|op| Some(op.id) == state.in_flight) {
            state.in_flight = None;
        }
        if !doomed.is_empty() {
            self.persist(&state).await?;
        }
        Ok(doomed)
    }

    /// Count a failed attempt.
    ///
    /// The operation is dropped once it has failed `MAX_RETRIES` times.
    /// Otherwise it moves to the tail of the queue, unless a later operation
    /// targets the same entity, in which case it keeps its place so the
    /// per-entity order is preserved.
    pub async fn record_failure(&self, op_id: Uuid) -> Result<Option<RetryOutcome>, StorageError> {
        let mut state = self.state.lock().await;
        if state.in_flight == Some(op_id) {
            state.in_flight = None;
        }
        let Some(index) = state.position(op_id) else {
            return Ok(None);
        };

        state.ops[index].retry_count += 1;
        let retry_count = state.ops[index].retry_count;

        let outcome = if retry_count >= MAX_RETRIES {
            RetryOutcome::Dropped(state.ops.remove(index))
        } else {
            let target = state.ops[index].target().clone();
            let blocked = state.ops[index + 1..]
                .iter()
                .any(|later| later.target() == &target);
            if !blocked {
                let op = state.ops.remove(index);
                state.ops.push(op);
            }
            RetryOutcome::Requeued { retry_count }
        };

        self.persist(&state).await?;
        Ok(Some(outcome))
    }

    /// Rewrite every remaining reference to `from` so it points at `to`.
    /// Changes enqueued for `from` afterwards are redirected to `to` as well.
    pub async fn remap_id(&self, from: &EntityId, to: &EntityId) -> Result<usize, StorageError> {
        let mut state = self.state.lock().await;
        state.aliases.insert(from.clone(), to.clone());
        let remapped = state
            .ops
            .iter_mut()
            .map(|op| op.remap(from, to))
            .filter(|changed| *changed)
            .count();
        if remapped > 0 {
            self.persist(&state).await?;
        }
        Ok(remapped)
    }

    /// Entities with at least one unconfirmed operation.
    pub async fn pending_ids(&self) -> HashSet<EntityId> {
        self.state
            .lock()
            .await
            .ops
            .iter()
            .map(|op| op.target().clone())
            .collect()
    }

    pub async fn has_pending_for(&self, id: &EntityId) -> bool {
        self.state.lock().await.ops.iter().any(|op| op.target() == id)
    }

    pub async fn snapshot(&self) -> Vec<PendingOperation> {
        self.state.lock().await.ops.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.ops.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.ops.is_empty()
    }
}
