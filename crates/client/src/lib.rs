//! `mousedeck-client`
//!
//! **Responsibility:** offline-capable catalog client.
//!
//! This crate provides:
//! - a locally persisted catalog cache with optimistic updates
//! - a durable queue of not-yet-applied mutations
//! - a sync engine that replays the queue when the backend is reachable
//! - connectivity tracking and a push listener for changes made elsewhere
//!
//! The API remains the authority; local state is reconciled against it.

pub mod api;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod push_listener;
pub mod queue;
pub mod storage;
pub mod store;
pub mod sync_engine;
pub mod types;

pub use api::{CatalogApi, HttpCatalogApi};
pub use client::{ClientHandle, OfflineClient};
pub use config::ClientConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityState};
pub use error::{ApiError, ClientError, PushError, StorageError};
pub use push_listener::{PushListener, PushListenerConfig};
pub use queue::{EnqueueOutcome, PendingQueue, RetryOutcome};
pub use storage::{LocalStorage, MemoryStorage, SqliteStorage};
pub use store::{CatalogStore, LocalMouse};
pub use sync_engine::{DrainReport, EngineState, SyncEngine, SyncEvent};
pub use types::{OperationKind, PendingChange, PendingOperation, MAX_RETRIES};
