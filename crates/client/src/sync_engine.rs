//! Replays the pending queue against the API.
//!
//! A drain pass sends operations one at a time, oldest first, and stops at
//! the first transient failure. Passes never overlap. A pass is started when
//! connectivity returns, when a change is enqueued, on a periodic tick while
//! work remains, and once at startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Notify};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use mousedeck_core::{EntityId, Mouse};

use crate::api::CatalogApi;
use crate::connectivity::ConnectivityState;
use crate::error::{ApiError, ClientError, StorageError};
use crate::queue::{PendingQueue, RetryOutcome};
use crate::store::CatalogStore;
use crate::types::{OperationKind, PendingChange, PendingOperation};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Draining,
    /// Last pass stopped on a transient failure; waiting for the next trigger.
    BackoffWait,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Applied {
        operation_id: Uuid,
        kind: OperationKind,
        id: EntityId,
        /// The temporary id the entity had before the server confirmed it.
        previous_id: Option<EntityId>,
    },
    Deferred {
        operation_id: Uuid,
        kind: OperationKind,
        retry_count: u32,
        reason: String,
    },
    TerminalFailure {
        operation: PendingOperation,
        reason: String,
    },
    StateChanged(EngineState),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    pub deferred: usize,
    pub dropped: usize,
    /// The pass did not run (offline, or another pass was active).
    pub skipped: bool,
}

enum Confirmed {
    Created(Mouse),
    Updated(Mouse),
    Deleted,
}

/// Clears the draining flag when a pass ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    queue: Arc<PendingQueue>,
    store: Arc<CatalogStore>,
    api: Arc<dyn CatalogApi>,
    connectivity: watch::Receiver<ConnectivityState>,
    draining: AtomicBool,
    state: watch::Sender<EngineState>,
    events: broadcast::Sender<SyncEvent>,
    wake: Notify,
    retry_interval: Duration,
}

impl SyncEngine {
    pub fn new(
        queue: Arc<PendingQueue>,
        store: Arc<CatalogStore>,
        api: Arc<dyn CatalogApi>,
        connectivity: watch::Receiver<ConnectivityState>,
        retry_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            queue,
            store,
            api,
            connectivity,
            draining: AtomicBool::new(false),
            state,
            events,
            wake: Notify::new(),
            retry_interval,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn is_syncing(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Ask the background loop for a pass.
    pub fn nudge(&self) {
        self.wake.notify_one();
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_state(&self, next: EngineState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!(state = ?next, "sync engine state changed");
            self.emit(SyncEvent::StateChanged(next));
        }
    }

    fn is_offline(&self) -> bool {
        self.connectivity.borrow().is_offline_mode()
    }

    /// Run one drain pass.
    pub async fn drain(&self) -> Result<DrainReport, StorageError> {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            tracing::debug!("drain already in progress");
            return Ok(DrainReport {
                skipped: true,
                ..DrainReport::default()
            });
        };
        if self.is_offline() {
            return Ok(DrainReport {
                skipped: true,
                ..DrainReport::default()
            });
        }

        self.set_state(EngineState::Draining);
        let mut report = DrainReport::default();
        let result = self.drain_pass(&mut report).await;
        self.set_state(match &result {
            Ok(state) => *state,
            Err(_) => EngineState::BackoffWait,
        });

        if report.applied + report.deferred + report.dropped > 0 {
            tracing::info!(
                applied = report.applied,
                deferred = report.deferred,
                dropped = report.dropped,
                "drain pass finished"
            );
        }
        result.map(|_| report)
    }

    async fn drain_pass(&self, report: &mut DrainReport) -> Result<EngineState, StorageError> {
        loop {
            if self.is_offline() {
                return Ok(EngineState::BackoffWait);
            }
            let Some(op) = self.queue.begin_next().await else {
                return Ok(EngineState::Idle);
            };

            match self.execute(&op).await {
                Ok(confirmed) => {
                    self.queue.complete(op.id).await?;
                    self.confirm(&op, confirmed).await?;
                    report.applied += 1;
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!(operation = %op.id, kind = op.kind().as_str(), error = %err, "sync attempt failed");
                    match self.queue.record_failure(op.id).await? {
                        Some(RetryOutcome::Requeued { retry_count }) => {
                            report.deferred += 1;
                            self.emit(SyncEvent::Deferred {
                                operation_id: op.id,
                                kind: op.kind(),
                                retry_count,
                                reason: err.to_string(),
                            });
                        }
                        Some(RetryOutcome::Dropped(dropped)) => {
                            report.dropped += self.abandon(dropped, &err).await?;
                        }
                        None => {}
                    }
                    return Ok(EngineState::BackoffWait);
                }
                Err(err) => {
                    tracing::warn!(operation = %op.id, kind = op.kind().as_str(), error = %err, "operation rejected");
                    if let Some(dropped) = self.queue.discard(op.id).await? {
                        report.dropped += self.abandon(dropped, &err).await?;
                    }
                }
            }
        }
    }

    async fn execute(&self, op: &PendingOperation) -> Result<Confirmed, ApiError> {
        match &op.change {
            PendingChange::Add { mouse, .. } => {
                self.api.create_mouse(mouse).await.map(Confirmed::Created)
            }
            PendingChange::Update { id, patch } => {
                // A temp id here means its ADD never reached the server.
                let id = id.server_id().ok_or(ApiError::NotFound)?;
                self.api.update_mouse(id, patch).await.map(Confirmed::Updated)
            }
            PendingChange::Delete { id } => {
                let id = id.server_id().ok_or(ApiError::NotFound)?;
                self.api.delete_mouse(id).await.map(|_| Confirmed::Deleted)
            }
        }
    }

    async fn confirm(&self, op: &PendingOperation, confirmed: Confirmed) -> Result<(), StorageError> {
        let target = op.target().clone();
        let (id, previous_id) = match confirmed {
            Confirmed::Created(mouse) => {
                let server_id = EntityId::Server(mouse.id);
                // Store before queue: the remap rewrites anything enqueued
                // under the temp id until the store starts resolving it.
                let keep_local = self.queue.has_pending_for(&target).await;
                self.store.reconcile(&target, mouse, keep_local).await?;
                self.queue.remap_id(&target, &server_id).await?;
                (server_id, Some(target))
            }
            Confirmed::Updated(mouse) => {
                if !self.queue.has_pending_for(&target).await {
                    self.store.upsert_confirmed(mouse).await?;
                }
                (target, None)
            }
            Confirmed::Deleted => {
                self.store.remove(&target).await?;
                (target, None)
            }
        };

        tracing::debug!(operation = %op.id, kind = op.kind().as_str(), %id, "operation applied");
        self.emit(SyncEvent::Applied {
            operation_id: op.id,
            kind: op.kind(),
            id,
            previous_id,
        });
        Ok(())
    }

    /// Report a dropped operation and undo what can no longer happen.
    /// Returns how many operations were dropped in total.
    async fn abandon(&self, op: PendingOperation, err: &ApiError) -> Result<usize, StorageError> {
        let target = op.target().clone();
        let mut dropped = 1;

        match (&op.change, err) {
            (PendingChange::Add { .. }, _) => {
                // The entity will never exist server-side.
                self.store.remove(&target).await?;
                for dependent in self.queue.discard_targeting(&target).await? {
                    dropped += 1;
                    self.emit(SyncEvent::TerminalFailure {
                        operation: dependent,
                        reason: format!("depends on dropped ADD {}", op.id),
                    });
                }
            }
            (PendingChange::Update { .. }, ApiError::NotFound) => {
                self.store.remove(&target).await?;
            }
            (PendingChange::Delete { .. }, ApiError::NotFound) => {}
            _ => {
                // Local state diverged from the server. Resync when possible.
                if let Err(e) = self.refresh().await {
                    tracing::debug!(error = %e, "resync after dropped operation failed");
                }
            }
        }

        tracing::error!(operation = %op.id, kind = op.kind().as_str(), retry_count = op.retry_count, error = %err, "operation dropped");
        self.emit(SyncEvent::TerminalFailure {
            operation: op,
            reason: err.to_string(),
        });
        Ok(dropped)
    }

    /// Pull the full catalog and merge it, keeping entities with pending work.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let mice = self.api.list_mice().await?;
        let count = mice.len();
        let pending = self.queue.pending_ids().await;
        self.store.replace_all(mice, &pending).await?;
        Ok(count)
    }

    async fn drain_logged(&self) {
        if let Err(e) = self.drain().await {
            tracing::error!(error = %e, "drain pass aborted");
        }
    }

    /// Drive drain passes until `shutdown` flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut connectivity = self.connectivity.clone();
        let mut was_offline = connectivity.borrow_and_update().is_offline_mode();
        let mut ticker = tokio::time::interval(self.retry_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!("sync engine started");
        self.drain_logged().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = self.wake.notified() => self.drain_logged().await,
                _ = ticker.tick() => {
                    if !self.queue.is_empty().await {
                        self.drain_logged().await;
                    }
                }
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let offline = connectivity.borrow_and_update().is_offline_mode();
                    if was_offline && !offline {
                        tracing::info!("connectivity restored, draining pending operations");
                        self.drain_logged().await;
                    }
                    was_offline = offline;
                }
            }
        }

        tracing::info!("sync engine stopped");
    }
}
