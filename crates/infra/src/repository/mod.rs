//! Catalog persistence boundary.
//!
//! The HTTP layer only talks to [`CatalogRepository`]; which backend sits behind
//! it (in-memory or PostgreSQL) is decided once at startup.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use mousedeck_core::{
    Category, CategoryId, CategoryPatch, DomainError, Mouse, MouseFilter, MouseId, MousePatch,
    NewCategory, NewMouse,
};

pub use in_memory::InMemoryCatalogRepository;
pub use postgres::PostgresCatalogRepository;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur when interacting with catalog storage.
///
/// - **Domain**: the request broke a domain rule (missing record, unknown
///   category reference, duplicate name)
/// - **Storage**: the backend itself failed
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Domain(DomainError::NotFound(_)))
    }
}

/// Catalog storage.
///
/// Implementations assign ids, keep the mouse/category links consistent and
/// reject references to categories that do not exist. Payload validation
/// (`NewMouse::validate` etc.) is the caller's job.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Mice matching `filter`, ordered by id.
    async fn list_mice(&self, filter: &MouseFilter) -> RepositoryResult<Vec<Mouse>>;

    async fn get_mouse(&self, id: MouseId) -> RepositoryResult<Mouse>;

    async fn create_mouse(&self, new: NewMouse) -> RepositoryResult<Mouse>;

    async fn update_mouse(&self, id: MouseId, patch: MousePatch) -> RepositoryResult<Mouse>;

    async fn delete_mouse(&self, id: MouseId) -> RepositoryResult<()>;

    /// Removes every generated record and returns the removed ids.
    async fn delete_generated(&self) -> RepositoryResult<Vec<MouseId>>;

    async fn count_mice(&self) -> RepositoryResult<u64>;

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>>;

    async fn get_category(&self, id: CategoryId) -> RepositoryResult<Category>;

    async fn create_category(&self, new: NewCategory) -> RepositoryResult<Category>;

    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> RepositoryResult<Category>;

    /// Deletes the category and its links; linked mice are kept.
    async fn delete_category(&self, id: CategoryId) -> RepositoryResult<()>;

    async fn mice_in_category(&self, id: CategoryId) -> RepositoryResult<Vec<Mouse>>;
}

pub(crate) fn unknown_categories(missing: &[CategoryId]) -> RepositoryError {
    let errors = missing
        .iter()
        .map(|id| format!("unknown category id {id}"))
        .collect();
    RepositoryError::Domain(DomainError::Validation(errors))
}

pub(crate) fn duplicate_category(name: &str) -> RepositoryError {
    RepositoryError::Domain(DomainError::conflict(format!(
        "category '{}' already exists",
        name.trim()
    )))
}
