//! Durable key-value storage for client state.
//!
//! Everything the client must survive a restart with (the cached catalog, the
//! pending operation queue, last-known connectivity) is stored as a JSON
//! document under a fixed key.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::error::StorageError;

/// Storage keys.
pub mod keys {
    pub const CACHED_MICE: &str = "cachedMice";
    pub const PENDING_OPERATIONS: &str = "pendingOperations";
    pub const CONNECTIVITY: &str = "connectivity";
    pub const CONFIRMED_IDS: &str = "confirmedIds";
}

#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON document, `None` when the key was never written.
pub async fn load_json<T: DeserializeOwned>(
    storage: &dyn LocalStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub async fn save_json<T: Serialize + ?Sized>(
    storage: &dyn LocalStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw).await
}

/// SQLite-backed storage (one row per key).
///
/// Cheap to clone. The pool is opened lazily on first use.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    path: PathBuf,
    pool: Arc<tokio::sync::Mutex<Option<SqlitePool>>>,
}

impl SqliteStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Storage at `{data_dir}/mousedeck/client.db`, using the OS data directory
    /// when `data_dir` is not given.
    pub fn in_data_dir(data_dir: Option<PathBuf>) -> Result<Self, StorageError> {
        let base = match data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .or_else(|| {
                    dirs::home_dir().map(|mut h| {
                        h.push(".local");
                        h.push("share");
                        h
                    })
                })
                .ok_or_else(|| {
                    StorageError::Unavailable(
                        "failed to resolve app data directory (tried data_dir and home_dir/.local/share)"
                            .into(),
                    )
                })?,
        };
        Ok(Self::new(base.join("mousedeck").join("client.db")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn pool(&self) -> Result<SqlitePool, StorageError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        tracing::debug!(path = %self.path.display(), "opened local storage");
        *guard = Some(pool.clone());
        Ok(pool)
    }
}

#[async_trait]
impl LocalStorage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let pool = self.pool().await?;
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&pool)
            .await?;
        Ok(match row {
            Some(row) => Some(row.try_get::<String, _>("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let pool = self.pool().await?;
        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&pool)
            .await?;
        Ok(())
    }
}

/// Volatile storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}
