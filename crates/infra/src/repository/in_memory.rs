use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use mousedeck_core::category::same_name;
use mousedeck_core::{
    Category, CategoryId, CategoryPatch, DomainError, Mouse, MouseFilter, MouseId, MousePatch,
    NewCategory, NewMouse,
};

use super::{
    duplicate_category, unknown_categories, CatalogRepository, RepositoryError, RepositoryResult,
};

#[derive(Debug, Default)]
struct CatalogState {
    mice: BTreeMap<MouseId, Mouse>,
    categories: BTreeMap<CategoryId, Category>,
    next_mouse_id: i64,
    next_category_id: i64,
}

impl CatalogState {
    fn allocate_mouse_id(&mut self) -> MouseId {
        self.next_mouse_id += 1;
        MouseId::new(self.next_mouse_id)
    }

    fn allocate_category_id(&mut self) -> CategoryId {
        self.next_category_id += 1;
        CategoryId::new(self.next_category_id)
    }

    fn check_categories(&self, ids: &[CategoryId]) -> RepositoryResult<()> {
        let missing: Vec<CategoryId> = ids
            .iter()
            .copied()
            .filter(|id| !self.categories.contains_key(id))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(unknown_categories(&missing))
        }
    }

    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| Some(c.id) != except && same_name(&c.name, name))
    }
}

/// In-memory catalog.
///
/// Intended for tests/dev and for running the server without a database.
/// Ids are assigned from monotonically increasing counters starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, CatalogState>> {
        self.state
            .read()
            .map_err(|_| RepositoryError::storage("lock poisoned"))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, CatalogState>> {
        self.state
            .write()
            .map_err(|_| RepositoryError::storage("lock poisoned"))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_mice(&self, filter: &MouseFilter) -> RepositoryResult<Vec<Mouse>> {
        let state = self.read()?;
        Ok(state
            .mice
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn get_mouse(&self, id: MouseId) -> RepositoryResult<Mouse> {
        self.read()?
            .mice
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::mouse_not_found().into())
    }

    async fn create_mouse(&self, new: NewMouse) -> RepositoryResult<Mouse> {
        let mut state = self.write()?;
        state.check_categories(&new.category_ids)?;
        let id = state.allocate_mouse_id();
        let mouse = new.into_mouse(id);
        state.mice.insert(id, mouse.clone());
        Ok(mouse)
    }

    async fn update_mouse(&self, id: MouseId, patch: MousePatch) -> RepositoryResult<Mouse> {
        let mut state = self.write()?;
        if !state.mice.contains_key(&id) {
            return Err(DomainError::mouse_not_found().into());
        }
        if let Some(ids) = &patch.category_ids {
            state.check_categories(ids)?;
        }
        let mouse = state
            .mice
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::from(DomainError::mouse_not_found()))?;
        patch.apply_to(mouse);
        Ok(mouse.clone())
    }

    async fn delete_mouse(&self, id: MouseId) -> RepositoryResult<()> {
        self.write()?
            .mice
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::mouse_not_found().into())
    }

    async fn delete_generated(&self) -> RepositoryResult<Vec<MouseId>> {
        let mut state = self.write()?;
        let doomed: Vec<MouseId> = state
            .mice
            .values()
            .filter(|m| m.is_generated)
            .map(|m| m.id)
            .collect();
        for id in &doomed {
            state.mice.remove(id);
        }
        Ok(doomed)
    }

    async fn count_mice(&self) -> RepositoryResult<u64> {
        Ok(self.read()?.mice.len() as u64)
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn get_category(&self, id: CategoryId) -> RepositoryResult<Category> {
        self.read()?
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::category_not_found().into())
    }

    async fn create_category(&self, new: NewCategory) -> RepositoryResult<Category> {
        let mut state = self.write()?;
        if state.name_taken(&new.name, None) {
            return Err(duplicate_category(&new.name));
        }
        let id = state.allocate_category_id();
        let category = new.into_category(id);
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> RepositoryResult<Category> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&id) {
            return Err(DomainError::category_not_found().into());
        }
        if let Some(name) = &patch.name {
            if state.name_taken(name, Some(id)) {
                return Err(duplicate_category(name));
            }
        }
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::from(DomainError::category_not_found()))?;
        patch.apply_to(category);
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> RepositoryResult<()> {
        let mut state = self.write()?;
        if state.categories.remove(&id).is_none() {
            return Err(DomainError::category_not_found().into());
        }
        for mouse in state.mice.values_mut() {
            mouse.category_ids.retain(|c| *c != id);
        }
        Ok(())
    }

    async fn mice_in_category(&self, id: CategoryId) -> RepositoryResult<Vec<Mouse>> {
        let state = self.read()?;
        if !state.categories.contains_key(&id) {
            return Err(DomainError::category_not_found().into());
        }
        Ok(state
            .mice
            .values()
            .filter(|m| m.category_ids.contains(&id))
            .cloned()
            .collect())
    }
}
