//! Queued mutation types, persisted under the `pendingOperations` key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mousedeck_core::{EntityId, MousePatch, NewMouse};

/// Failed attempts after which an operation is dropped.
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Add,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "ADD",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
        }
    }
}

/// What a queued operation does. Serialized as `{"type": "ADD", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "UPPERCASE")]
pub enum PendingChange {
    Add {
        #[serde(rename = "tempId")]
        temp_id: EntityId,
        mouse: NewMouse,
    },
    Update {
        id: EntityId,
        patch: MousePatch,
    },
    Delete {
        id: EntityId,
    },
}

impl PendingChange {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingChange::Add { .. } => OperationKind::Add,
            PendingChange::Update { .. } => OperationKind::Update,
            PendingChange::Delete { .. } => OperationKind::Delete,
        }
    }

    /// The entity this change applies to (the temporary id for an ADD).
    pub fn target(&self) -> &EntityId {
        match self {
            PendingChange::Add { temp_id, .. } => temp_id,
            PendingChange::Update { id, .. } | PendingChange::Delete { id } => id,
        }
    }

    pub(crate) fn target_mut(&mut self) -> &mut EntityId {
        match self {
            PendingChange::Add { temp_id, .. } => temp_id,
            PendingChange::Update { id, .. } | PendingChange::Delete { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub id: Uuid,
    pub change: PendingChange,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
}

impl PendingOperation {
    pub fn new(change: PendingChange) -> Self {
        Self {
            id: Uuid::now_v7(),
            change,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.change.kind()
    }

    pub fn target(&self) -> &EntityId {
        self.change.target()
    }

    /// Point the operation at `to` if it currently targets `from`.
    pub(crate) fn remap(&mut self, from: &EntityId, to: &EntityId) -> bool {
        let target = self.change.target_mut();
        if target == from {
            *target = to.clone();
            true
        } else {
            false
        }
    }
}
