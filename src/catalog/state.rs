//! In-memory application state for the animal catalog.

use std::collections::{BTreeSet, HashMap};

use super::Animal;
use crate::clock::DAY_MS;

/// Fixed list page size.
pub const PAGE_SIZE: usize = 50;

/// How long a loaded list stays fresh before a refresh is due.
pub const REFRESH_TTL_MS: i64 = DAY_MS;

/// One page of the catalog listing.
#[derive(Debug)]
pub struct Page<'a> {
    /// 1-indexed page number actually returned after clamping.
    pub number: usize,
    /// Total page count (at least 1).
    pub total_pages: usize,
    pub animals: Vec<&'a Animal>,
}

/// Catalog state: records keyed by name, display order, favorites and tombstones.
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub(crate) by_name: HashMap<String, Animal>,
    pub(crate) all_names: Vec<String>,
    pub(crate) favorites: Vec<String>,
    pub(crate) removed: BTreeSet<String>,
    pub(crate) loading: bool,
    pub(crate) error: Option<String>,
    pub(crate) updated_at: Option<i64>,
}

impl CatalogState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Animal> {
        self.by_name.get(name)
    }

    /// Names in display order.
    #[must_use]
    pub fn all_names(&self) -> &[String] {
        &self.all_names
    }

    #[must_use]
    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    #[must_use]
    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn is_removed(&self, name: &str) -> bool {
        self.removed.contains(name)
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn updated_at(&self) -> Option<i64> {
        self.updated_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.all_names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_names.is_empty()
    }

    /// Replaces the list with `animals`.
    ///
    /// Duplicate names keep their first occurrence. Tombstoned names are skipped.
    /// Favorites are left untouched.
    pub fn set_animals(&mut self, animals: Vec<Animal>, now: i64) {
        self.by_name.clear();
        self.all_names.clear();
        for animal in animals {
            if self.removed.contains(&animal.name) || self.by_name.contains_key(&animal.name) {
                continue;
            }
            self.all_names.push(animal.name.clone());
            self.by_name.insert(animal.name.clone(), animal);
        }
        self.updated_at = Some(now);
    }

    /// Inserts or replaces a manually added record. Returns true if the name is new.
    pub fn add_animal(&mut self, animal: Animal, now: i64) -> bool {
        self.removed.remove(&animal.name);
        let is_new = !self.by_name.contains_key(&animal.name);
        if is_new {
            self.all_names.push(animal.name.clone());
        }
        self.by_name.insert(animal.name.clone(), animal);
        self.updated_at = Some(now);
        is_new
    }

    /// Marks `name` as a favorite. Returns false if it already was one.
    pub fn add_favorite(&mut self, name: &str) -> bool {
        if self.is_favorite(name) {
            return false;
        }
        self.favorites.push(name.to_string());
        true
    }

    /// Returns false if `name` was not a favorite.
    pub fn remove_favorite(&mut self, name: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|n| n != name);
        self.favorites.len() != before
    }

    /// Flips the favorite flag and returns the new value.
    pub fn toggle_favorite(&mut self, name: &str) -> bool {
        if self.remove_favorite(name) {
            false
        } else {
            self.add_favorite(name)
        }
    }

    /// Deletes a record and tombstones its name. Returns the removed record.
    ///
    /// An unknown name leaves the state untouched.
    pub fn remove_animal(&mut self, name: &str, now: i64) -> Option<Animal> {
        let removed = self.by_name.remove(name)?;
        self.all_names.retain(|n| n != name);
        self.favorites.retain(|n| n != name);
        self.removed.insert(name.to_string());
        self.updated_at = Some(now);
        Some(removed)
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Empties records, favorites and tombstones.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when the list is empty or at least [`REFRESH_TTL_MS`] old.
    #[must_use]
    pub fn needs_refresh(&self, now: i64) -> bool {
        match self.updated_at {
            _ if self.all_names.is_empty() => true,
            None => true,
            Some(updated_at) => now - updated_at >= REFRESH_TTL_MS,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.all_names.len().div_ceil(PAGE_SIZE).max(1)
    }

    /// Returns page `number` (1-indexed, clamped into range).
    #[must_use]
    pub fn page(&self, number: usize) -> Page<'_> {
        let total_pages = self.total_pages();
        let number = number.clamp(1, total_pages);
        let start = (number - 1) * PAGE_SIZE;
        let animals = self
            .all_names
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .filter_map(|name| self.by_name.get(name))
            .collect();
        Page {
            number,
            total_pages,
            animals,
        }
    }

    /// Favorite records in the order they were favorited.
    #[must_use]
    pub fn favorite_animals(&self) -> Vec<&Animal> {
        self.favorites
            .iter()
            .filter_map(|name| self.by_name.get(name))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn animals(names: &[&str]) -> Vec<Animal> {
        names.iter().map(|n| Animal::named(*n)).collect()
    }

    // ==================== set_animals Tests ====================

    #[test]
    fn test_set_animals_dedupes_keeping_first() {
        let mut state = CatalogState::new();
        let mut first = Animal::named("Lion");
        first.locations.push("Africa".to_string());
        let list = vec![first, Animal::named("Tiger"), Animal::named("Lion")];

        state.set_animals(list, 10);

        assert_eq!(state.all_names(), ["Lion", "Tiger"]);
        assert_eq!(state.get("Lion").unwrap().locations, vec!["Africa"]);
        assert_eq!(state.updated_at(), Some(10));
    }

    #[test]
    fn test_set_animals_skips_tombstoned_names() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion", "Tiger"]), 1);
        state.remove_animal("Lion", 2);

        state.set_animals(animals(&["Lion", "Tiger", "Zebra"]), 3);

        assert_eq!(state.all_names(), ["Tiger", "Zebra"]);
        assert!(state.is_removed("Lion"));
    }

    #[test]
    fn test_set_animals_keeps_favorites() {
        let mut state = CatalogState::new();
        state.add_favorite("Tiger");
        state.set_animals(animals(&["Tiger"]), 1);
        assert!(state.is_favorite("Tiger"));
    }

    // ==================== add/remove Tests ====================

    #[test]
    fn test_add_animal_appends_and_clears_tombstone() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion"]), 1);
        state.remove_animal("Lion", 2);

        assert!(state.add_animal(Animal::named("Lion"), 3));
        assert!(!state.is_removed("Lion"));
        assert_eq!(state.all_names(), ["Lion"]);
    }

    #[test]
    fn test_add_animal_replaces_existing_without_reordering() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion", "Tiger"]), 1);

        let mut lion = Animal::named("Lion");
        lion.image = Some("https://example.com/lion.jpg".to_string());
        assert!(!state.add_animal(lion, 2));

        assert_eq!(state.all_names(), ["Lion", "Tiger"]);
        assert!(state.get("Lion").unwrap().image.is_some());
    }

    #[test]
    fn test_remove_animal_drops_from_favorites() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion", "Tiger"]), 1);
        state.add_favorite("Lion");

        let removed = state.remove_animal("Lion", 5).unwrap();

        assert_eq!(removed.name, "Lion");
        assert!(state.get("Lion").is_none());
        assert!(!state.is_favorite("Lion"));
        assert_eq!(state.all_names(), ["Tiger"]);
        assert_eq!(state.updated_at(), Some(5));
    }

    #[test]
    fn test_remove_unknown_animal_leaves_state_untouched() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion"]), 1);
        state.add_favorite("Ghost");

        assert!(state.remove_animal("Ghost", 99).is_none());

        assert!(!state.is_removed("Ghost"));
        assert!(state.is_favorite("Ghost"));
        assert_eq!(state.updated_at(), Some(1));
        assert_eq!(state.all_names(), ["Lion"]);
    }

    // ==================== Favorites Tests ====================

    #[test]
    fn test_add_favorite_is_idempotent() {
        let mut state = CatalogState::new();
        assert!(state.add_favorite("Lion"));
        assert!(!state.add_favorite("Lion"));
        assert_eq!(state.favorites(), ["Lion"]);
    }

    #[test]
    fn test_toggle_favorite_flips() {
        let mut state = CatalogState::new();
        assert!(state.toggle_favorite("Lion"));
        assert!(!state.toggle_favorite("Lion"));
        assert!(state.favorites().is_empty());
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion", "Tiger"]), 1);
        state.add_favorite("Lion");
        state.remove_animal("Tiger", 2);
        state.set_error(Some("boom".to_string()));

        state.clear();

        assert!(state.is_empty());
        assert!(state.favorites().is_empty());
        assert!(!state.is_removed("Tiger"));
        assert!(state.error().is_none());
        assert!(state.updated_at().is_none());
    }

    // ==================== Refresh Tests ====================

    #[test]
    fn test_needs_refresh_rules() {
        let mut state = CatalogState::new();
        assert!(state.needs_refresh(0));

        state.set_animals(animals(&["Lion"]), 1_000);
        assert!(!state.needs_refresh(1_000 + REFRESH_TTL_MS - 1));
        assert!(state.needs_refresh(1_000 + REFRESH_TTL_MS));
    }

    #[test]
    fn test_needs_refresh_when_list_emptied() {
        let mut state = CatalogState::new();
        state.set_animals(Vec::new(), 1_000);
        assert!(state.needs_refresh(1_001));
    }

    // ==================== Paging Tests ====================

    #[test]
    fn test_page_splits_and_clamps() {
        let mut state = CatalogState::new();
        let names: Vec<String> = (0..120).map(|i| format!("animal-{i:03}")).collect();
        state.set_animals(names.iter().map(Animal::named).collect(), 1);

        assert_eq!(state.total_pages(), 3);

        let first = state.page(1);
        assert_eq!(first.animals.len(), PAGE_SIZE);
        assert_eq!(first.animals[0].name, "animal-000");

        let last = state.page(3);
        assert_eq!(last.animals.len(), 20);
        assert_eq!(last.animals[0].name, "animal-100");

        assert_eq!(state.page(0).number, 1);
        assert_eq!(state.page(99).number, 3);
    }

    #[test]
    fn test_page_on_empty_state() {
        let state = CatalogState::new();
        let page = state.page(1);
        assert_eq!(page.total_pages, 1);
        assert!(page.animals.is_empty());
    }

    #[test]
    fn test_favorite_animals_skips_unknown_names() {
        let mut state = CatalogState::new();
        state.set_animals(animals(&["Lion", "Tiger"]), 1);
        state.add_favorite("Tiger");
        state.add_favorite("Ghost");

        let favs: Vec<&str> = state
            .favorite_animals()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(favs, vec!["Tiger"]);
    }
}
