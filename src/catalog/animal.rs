//! Animal records and the manual-add draft.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CatalogError;

/// Taxonomy key holding the binomial name.
pub const SCIENTIFIC_NAME_KEY: &str = "scientific_name";

/// One characteristic value as delivered by the data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Characteristic {
    /// Free text, e.g. `"Carnivore"`.
    Text(String),
    /// Plain number.
    Number(f64),
    /// List of text values.
    List(Vec<String>),
}

impl Characteristic {
    /// True when the value carries no information (blank text, NaN, all-blank list).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// An animal record. `name` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub name: String,
    #[serde(default)]
    pub taxonomy: BTreeMap<String, String>,
    #[serde(default)]
    pub characteristics: BTreeMap<String, Characteristic>,
    #[serde(default)]
    pub locations: Vec<String>,
    /// URL or data URI supplied by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Animal {
    /// Creates a record with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            taxonomy: BTreeMap::new(),
            characteristics: BTreeMap::new(),
            locations: Vec::new(),
            image: None,
        }
    }

    /// `taxonomy.scientific_name`, if present and non-blank.
    #[must_use]
    pub fn scientific_name(&self) -> Option<&str> {
        self.taxonomy
            .get(SCIENTIFIC_NAME_KEY)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Unvalidated user input for a manually added animal.
#[derive(Debug, Clone, Default)]
pub struct AnimalDraft {
    pub name: String,
    pub taxonomy: BTreeMap<String, String>,
    pub characteristics: BTreeMap<String, Characteristic>,
    pub locations: Vec<String>,
    pub image_url: Option<String>,
}

impl AnimalDraft {
    /// Validates the draft and drops blank fields.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyName`] when the trimmed name is empty.
    pub fn into_animal(self) -> Result<Animal, CatalogError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }

        let taxonomy = self
            .taxonomy
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value.trim();
                (!value.is_empty()).then(|| (key, value.to_string()))
            })
            .collect();

        let characteristics = self
            .characteristics
            .into_iter()
            .filter(|(_, value)| !value.is_blank())
            .collect();

        let locations = self
            .locations
            .into_iter()
            .filter(|location| !location.trim().is_empty())
            .collect();

        let image = self
            .image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Animal {
            name,
            taxonomy,
            characteristics,
            locations,
            image,
        })
    }
}
