//! Service wiring: catalog storage plus push fan-out.
//!
//! Every successful mutation is broadcast after the write returns, so clients
//! never see a change the store did not accept.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mousedeck_core::{
    Category, CategoryId, CategoryPatch, ListQuery, Listing, Mouse, MouseFilter, MouseId,
    MousePatch, NewCategory, NewMouse, PushMessage,
};
use mousedeck_infra::{
    db, seed, CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository,
    RepositoryResult,
};

use crate::app::push::ConnectionRegistry;
use crate::config::ApiConfig;

pub struct AppServices {
    repo: Arc<dyn CatalogRepository>,
    registry: ConnectionRegistry,
}

impl AppServices {
    pub fn new(repo: Arc<dyn CatalogRepository>, registry: ConnectionRegistry) -> Self {
        Self { repo, registry }
    }

    /// Empty in-memory catalog (tests, local dev).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryCatalogRepository::new()),
            ConnectionRegistry::new(),
        )
    }

    pub async fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let repo: Arc<dyn CatalogRepository> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url).await?;
                let repo = PostgresCatalogRepository::new(pool);
                repo.ensure_schema()
                    .await
                    .context("failed to create catalog schema")?;
                info!("using postgres catalog");
                Arc::new(repo)
            }
            None => {
                info!("DATABASE_URL not set, using in-memory catalog");
                Arc::new(InMemoryCatalogRepository::new())
            }
        };

        if config.seed_catalog {
            seed::seed_if_empty(repo.as_ref())
                .await
                .context("failed to seed catalog")?;
        }

        Ok(Self::new(repo, ConnectionRegistry::new()))
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    // -------------------------
    // Mice
    // -------------------------

    pub async fn list_mice(&self, query: &ListQuery) -> RepositoryResult<Listing> {
        let rows = self.repo.list_mice(&query.filter).await?;
        Ok(query.apply(rows))
    }

    /// Current catalog, as sent in `INITIAL_DATA`.
    pub async fn snapshot(&self) -> RepositoryResult<Vec<Mouse>> {
        self.repo.list_mice(&MouseFilter::default()).await
    }

    pub async fn get_mouse(&self, id: MouseId) -> RepositoryResult<Mouse> {
        self.repo.get_mouse(id).await
    }

    pub async fn create_mouse(&self, new: NewMouse) -> RepositoryResult<Mouse> {
        let mouse = self.repo.create_mouse(new).await?;
        info!(mouse_id = %mouse.id, "mouse created");
        self.registry.broadcast(&PushMessage::new_mouse(mouse.clone()));
        Ok(mouse)
    }

    pub async fn update_mouse(&self, id: MouseId, patch: MousePatch) -> RepositoryResult<Mouse> {
        let mouse = self.repo.update_mouse(id, patch).await?;
        info!(mouse_id = %mouse.id, "mouse updated");
        self.registry
            .broadcast(&PushMessage::updated_mouse(mouse.clone()));
        Ok(mouse)
    }

    /// Deletes and returns the removed record.
    pub async fn delete_mouse(&self, id: MouseId) -> RepositoryResult<Mouse> {
        let mouse = self.repo.get_mouse(id).await?;
        self.repo.delete_mouse(id).await?;
        info!(mouse_id = %id, "mouse deleted");
        self.registry.broadcast(&PushMessage::deleted_mouse(id));
        Ok(mouse)
    }

    pub async fn delete_generated(&self) -> RepositoryResult<Vec<MouseId>> {
        let removed = self.repo.delete_generated().await?;
        info!(count = removed.len(), "generated mice deleted");
        for id in &removed {
            self.registry.broadcast(&PushMessage::deleted_mouse(*id));
        }
        Ok(removed)
    }

    // -------------------------
    // Categories
    // -------------------------

    pub async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        self.repo.list_categories().await
    }

    pub async fn get_category(&self, id: CategoryId) -> RepositoryResult<Category> {
        self.repo.get_category(id).await
    }

    pub async fn create_category(&self, new: NewCategory) -> RepositoryResult<Category> {
        let category = self.repo.create_category(new).await?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> RepositoryResult<Category> {
        self.repo.update_category(id, patch).await
    }

    pub async fn delete_category(&self, id: CategoryId) -> RepositoryResult<()> {
        self.repo.delete_category(id).await?;
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn mice_in_category(&self, id: CategoryId) -> RepositoryResult<Vec<Mouse>> {
        self.repo.mice_in_category(id).await
    }
}
