//! Animal catalog: records, favorites and their device-local persistence.
//!
//! # Overview
//!
//! - [`Animal`] / [`AnimalDraft`] - Record model and manual-add validation
//! - [`CatalogState`] - In-memory state and its pure operations
//! - [`CatalogRepository`] - One-record-per-key persistence
//! - [`Catalog`] - Facade that applies an operation then persists what it touched
//!
//! The in-memory state is authoritative. Persistence failures are logged and
//! never fail an operation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use animal_catalog_core::catalog::Catalog;
//! use animal_catalog_core::store::MemoryStore;
//!
//! # async fn example() {
//! let mut catalog = Catalog::open(Arc::new(MemoryStore::new())).await;
//! catalog.toggle_favorite("Lion").await;
//! catalog.close().await;
//! # }
//! ```

mod animal;
mod error;
mod persistence;
mod state;

pub use animal::{Animal, AnimalDraft, Characteristic, SCIENTIFIC_NAME_KEY};
pub use error::CatalogError;
pub use persistence::{CatalogRepository, LoadOutcome, PersistError, SCHEMA_VERSION};
pub use state::{CatalogState, PAGE_SIZE, Page, REFRESH_TTL_MS};

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::clock::now_millis;
use crate::store::KeyValueStore;

fn log_persist_failure(operation: &str, result: Result<(), PersistError>) {
    if let Err(error) = result {
        warn!(operation, error = %error, "catalog persistence failed; keeping in-memory state");
    }
}

/// Catalog facade over [`CatalogState`] and [`CatalogRepository`].
#[derive(Debug)]
pub struct Catalog {
    state: CatalogState,
    repo: CatalogRepository,
}

impl Catalog {
    /// Loads persisted state from `store`.
    ///
    /// First use writes the schema version. An unknown version, or a store
    /// that cannot be read, starts from empty state.
    #[instrument(skip(store))]
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let repo = CatalogRepository::new(store);
        let state = match repo.load().await {
            Ok(LoadOutcome::Loaded(state)) => state,
            Ok(outcome @ (LoadOutcome::Fresh | LoadOutcome::Reset)) => {
                if matches!(outcome, LoadOutcome::Reset) {
                    log_persist_failure("reset", repo.clear(&[]).await);
                }
                log_persist_failure("schema_version", repo.write_schema_version().await);
                CatalogState::new()
            }
            Err(error) => {
                warn!(error = %error, "could not load catalog, starting empty");
                CatalogState::new()
            }
        };
        info!(animals = state.len(), favorites = state.favorites().len(), "catalog opened");
        Self { state, repo }
    }

    /// Release hook. Flushes the index so the last ordering is durable.
    pub async fn close(self) {
        log_persist_failure("close", self.repo.save_index(&self.state).await);
    }

    #[must_use]
    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    /// Looks up an animal by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no record has that name.
    pub fn get(&self, name: &str) -> Result<&Animal, CatalogError> {
        self.state
            .get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.state.needs_refresh(now_millis())
    }

    /// Replaces the loaded list and persists every record plus the index.
    #[instrument(skip(self, animals), fields(count = animals.len()))]
    pub async fn set_animals(&mut self, animals: Vec<Animal>) {
        let stale: Vec<String> = self.state.all_names().to_vec();
        self.state.set_animals(animals, now_millis());

        for name in stale.iter().filter(|n| self.state.get(n).is_none()) {
            log_persist_failure("delete_animal", self.repo.delete_animal(name).await);
        }
        for name in self.state.all_names() {
            if let Some(animal) = self.state.get(name) {
                log_persist_failure("save_animal", self.repo.save_animal(animal).await);
            }
        }
        log_persist_failure("save_index", self.repo.save_index(&self.state).await);
    }

    /// Validates and inserts a manually added animal.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyName`] when the draft has no name.
    pub async fn add_animal(&mut self, draft: AnimalDraft) -> Result<&Animal, CatalogError> {
        let animal = draft.into_animal()?;
        let name = animal.name.clone();
        let was_removed = self.state.is_removed(&name);

        log_persist_failure("save_animal", self.repo.save_animal(&animal).await);
        self.state.add_animal(animal, now_millis());
        log_persist_failure("save_index", self.repo.save_index(&self.state).await);
        if was_removed {
            log_persist_failure("save_removed", self.repo.save_removed(&self.state).await);
        }

        self.get(&name)
    }

    /// Flips the favorite flag and returns the new value.
    pub async fn toggle_favorite(&mut self, name: &str) -> bool {
        let now_favorite = self.state.toggle_favorite(name);
        log_persist_failure("save_favorites", self.repo.save_favorites(&self.state).await);
        now_favorite
    }

    pub async fn add_favorite(&mut self, name: &str) {
        if self.state.add_favorite(name) {
            log_persist_failure("save_favorites", self.repo.save_favorites(&self.state).await);
        }
    }

    pub async fn remove_favorite(&mut self, name: &str) {
        if self.state.remove_favorite(name) {
            log_persist_failure("save_favorites", self.repo.save_favorites(&self.state).await);
        }
    }

    /// Deletes an animal and tombstones the name so refreshes skip it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if no record has that name.
    pub async fn remove_animal(&mut self, name: &str) -> Result<Animal, CatalogError> {
        let was_favorite = self.state.is_favorite(name);
        let removed = self
            .state
            .remove_animal(name, now_millis())
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

        log_persist_failure("delete_animal", self.repo.delete_animal(name).await);
        log_persist_failure("save_index", self.repo.save_index(&self.state).await);
        log_persist_failure("save_removed", self.repo.save_removed(&self.state).await);
        if was_favorite {
            log_persist_failure("save_favorites", self.repo.save_favorites(&self.state).await);
        }
        Ok(removed)
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.set_loading(loading);
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.state.set_error(error);
    }

    /// Empties the catalog and its persisted records.
    pub async fn clear(&mut self) {
        let names = self.state.all_names().to_vec();
        self.state.clear();
        log_persist_failure("clear", self.repo.clear(&names).await);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    /// Store whose writes always fail.
    struct FullStore;

    #[async_trait]
    impl KeyValueStore for FullStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            Err(StoreError::quota_exceeded(key, value.len(), 0))
        }
        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_open_writes_schema_version() {
        let store = Arc::new(MemoryStore::new());
        let catalog = Catalog::open(store.clone()).await;
        assert!(catalog.state().is_empty());
        assert_eq!(
            store.get("catalog:schema_version").await.unwrap().as_deref(),
            Some("1")
        );
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = Catalog::open(store.clone()).await;
        catalog
            .set_animals(vec![Animal::named("Lion"), Animal::named("Tiger")])
            .await;
        catalog.toggle_favorite("Tiger").await;
        catalog.remove_animal("Lion").await.unwrap();
        catalog.close().await;

        let reopened = Catalog::open(store).await;
        assert_eq!(reopened.state().all_names(), ["Tiger"]);
        assert_eq!(reopened.state().favorites(), ["Tiger"]);
        assert!(reopened.state().is_removed("Lion"));
    }

    #[tokio::test]
    async fn test_set_animals_deletes_dropped_records() {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = Catalog::open(store.clone()).await;
        catalog.set_animals(vec![Animal::named("Lion")]).await;
        catalog.set_animals(vec![Animal::named("Tiger")]).await;

        assert!(store.get("catalog:animal:Lion").await.unwrap().is_none());
        assert!(store.get("catalog:animal:Tiger").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_animal_validates_draft() {
        let mut catalog = Catalog::open(Arc::new(MemoryStore::new())).await;
        let err = catalog.add_animal(AnimalDraft::default()).await.unwrap_err();
        assert!(matches!(err, CatalogError::EmptyName));
        assert!(catalog.state().is_empty());
    }

    #[tokio::test]
    async fn test_add_animal_persists_record() {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = Catalog::open(store.clone()).await;
        let draft = AnimalDraft {
            name: " Axolotl ".to_string(),
            ..AnimalDraft::default()
        };
        let added = catalog.add_animal(draft).await.unwrap();
        assert_eq!(added.name, "Axolotl");
        assert!(store.get("catalog:animal:Axolotl").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_unknown_animal_is_not_found() {
        let mut catalog = Catalog::open(Arc::new(MemoryStore::new())).await;
        let err = catalog.remove_animal("Ghost").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref n) if n == "Ghost"));
    }

    #[tokio::test]
    async fn test_remove_unknown_animal_keeps_stale_catalog_stale() {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = Catalog::open(store.clone()).await;
        catalog.set_animals(vec![Animal::named("Lion")]).await;
        catalog.state.updated_at = Some(now_millis() - 2 * REFRESH_TTL_MS);
        assert!(catalog.needs_refresh());

        assert!(catalog.remove_animal("Ghost").await.is_err());

        assert!(catalog.needs_refresh());
        assert!(!catalog.state().is_removed("Ghost"));
        catalog.close().await;

        let reopened = Catalog::open(store).await;
        assert!(reopened.needs_refresh());
        assert!(!reopened.state().is_removed("Ghost"));
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_fail_operations() {
        let mut catalog = Catalog::open(Arc::new(FullStore)).await;
        catalog.set_animals(vec![Animal::named("Lion")]).await;
        assert!(catalog.toggle_favorite("Lion").await);
        assert!(catalog.get("Lion").is_ok());
    }

    #[tokio::test]
    async fn test_unknown_schema_version_resets_store() {
        let store = Arc::new(MemoryStore::new());
        store.set("catalog:schema_version", "7").await.unwrap();
        store.set("catalog:favorites", r#"["Lion"]"#).await.unwrap();

        let catalog = Catalog::open(store.clone()).await;

        assert!(catalog.state().favorites().is_empty());
        assert_eq!(
            store.get("catalog:schema_version").await.unwrap().as_deref(),
            Some("1")
        );
        assert!(store.get("catalog:favorites").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = Catalog::open(store.clone()).await;
        catalog.set_animals(vec![Animal::named("Lion")]).await;
        catalog.add_favorite("Lion").await;

        catalog.clear().await;

        assert!(catalog.state().is_empty());
        assert_eq!(store.len(), 1);
    }
}
