//! Per-record persistence of [`CatalogState`] in a [`KeyValueStore`].
//!
//! Layout:
//!
//! | key                        | value                         |
//! |----------------------------|-------------------------------|
//! | `catalog:schema_version`   | `1`                           |
//! | `catalog:index`            | `{all_names, updated_at}`     |
//! | `catalog:favorites`        | JSON list of names            |
//! | `catalog:removed`          | JSON list of tombstoned names |
//! | `catalog:animal:{name}`    | one [`Animal`]                |

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{Animal, CatalogState};
use crate::store::{KeyValueStore, StoreError};

/// Current persisted layout version.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &str = "catalog:schema_version";
const INDEX_KEY: &str = "catalog:index";
const FAVORITES_KEY: &str = "catalog:favorites";
const REMOVED_KEY: &str = "catalog:removed";
const ANIMAL_KEY_PREFIX: &str = "catalog:animal:";

fn animal_key(name: &str) -> String {
    format!("{ANIMAL_KEY_PREFIX}{name}")
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogIndex {
    all_names: Vec<String>,
    updated_at: Option<i64>,
}

/// Failure reading or writing one persisted record.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed record '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes catalog records one key at a time.
#[derive(Clone)]
pub struct CatalogRepository {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CatalogRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRepository").finish_non_exhaustive()
    }
}

impl CatalogRepository {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistError::Malformed {
                key: key.to_string(),
                source,
            })
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistError> {
        let raw = serde_json::to_string(value).map_err(|source| PersistError::Malformed {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &raw).await?;
        Ok(())
    }

    /// Loads the full state.
    ///
    /// Missing keys yield empty state. An unknown schema version also yields
    /// empty state, and the caller is expected to rewrite the layout. A record
    /// that fails to parse is dropped from the index with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the store itself fails or an index record
    /// is malformed.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<LoadOutcome, PersistError> {
        let version: Option<u32> = self.read_json(SCHEMA_VERSION_KEY).await?;
        match version {
            None => return Ok(LoadOutcome::Fresh),
            Some(SCHEMA_VERSION) => {}
            Some(other) => {
                warn!(found = other, expected = SCHEMA_VERSION, "unknown catalog schema version, resetting");
                return Ok(LoadOutcome::Reset);
            }
        }

        let index: CatalogIndex = self.read_json(INDEX_KEY).await?.unwrap_or_default();
        let favorites: Vec<String> = self.read_json(FAVORITES_KEY).await?.unwrap_or_default();
        let removed: BTreeSet<String> = self.read_json(REMOVED_KEY).await?.unwrap_or_default();

        let mut state = CatalogState {
            favorites,
            removed,
            updated_at: index.updated_at,
            ..CatalogState::default()
        };

        for name in index.all_names {
            match self.read_json::<Animal>(&animal_key(&name)).await {
                Ok(Some(animal)) => {
                    state.all_names.push(name.clone());
                    state.by_name.insert(name, animal);
                }
                Ok(None) => debug!(name = %name, "indexed animal record missing, skipping"),
                Err(error) => warn!(name = %name, error = %error, "dropping unreadable animal record"),
            }
        }

        Ok(LoadOutcome::Loaded(state))
    }

    /// Writes the schema version marker.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the write fails.
    pub async fn write_schema_version(&self) -> Result<(), PersistError> {
        self.write_json(SCHEMA_VERSION_KEY, &SCHEMA_VERSION).await
    }

    /// Writes the name order and refresh timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the write fails.
    pub async fn save_index(&self, state: &CatalogState) -> Result<(), PersistError> {
        let index = CatalogIndex {
            all_names: state.all_names.clone(),
            updated_at: state.updated_at,
        };
        self.write_json(INDEX_KEY, &index).await
    }

    /// # Errors
    ///
    /// Returns [`PersistError`] if the write fails.
    pub async fn save_favorites(&self, state: &CatalogState) -> Result<(), PersistError> {
        self.write_json(FAVORITES_KEY, &state.favorites).await
    }

    /// # Errors
    ///
    /// Returns [`PersistError`] if the write fails.
    pub async fn save_removed(&self, state: &CatalogState) -> Result<(), PersistError> {
        self.write_json(REMOVED_KEY, &state.removed).await
    }

    /// # Errors
    ///
    /// Returns [`PersistError`] if the write fails.
    pub async fn save_animal(&self, animal: &Animal) -> Result<(), PersistError> {
        self.write_json(&animal_key(&animal.name), animal).await
    }

    /// # Errors
    ///
    /// Returns [`PersistError`] if the delete fails.
    pub async fn delete_animal(&self, name: &str) -> Result<(), PersistError> {
        self.store.remove(&animal_key(name)).await?;
        Ok(())
    }

    /// Deletes every record named in `names` plus the index, favorites and
    /// tombstone lists. The schema version marker is kept.
    ///
    /// # Errors
    ///
    /// Returns the first [`PersistError`] encountered; later keys are still attempted.
    pub async fn clear(&self, names: &[String]) -> Result<(), PersistError> {
        let mut first_error = None;
        let keys = names
            .iter()
            .map(|n| animal_key(n))
            .chain([INDEX_KEY, FAVORITES_KEY, REMOVED_KEY].map(str::to_string));
        for key in keys {
            if let Err(error) = self.store.remove(&key).await {
                first_error.get_or_insert(PersistError::from(error));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Result of [`CatalogRepository::load`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// Nothing persisted yet.
    Fresh,
    /// Persisted layout had an unknown version and was discarded.
    Reset,
    Loaded(CatalogState),
}
