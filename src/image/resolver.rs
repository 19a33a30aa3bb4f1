//! Resolution orchestrator: cache, queries, fetch, score, validate.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{
    ImageCache, ImageCandidate, ImageSearch, ImageValidator, fetch_all_candidates, generate_queries,
    score_and_sort,
};
use crate::catalog::Animal;

/// Message reported when nothing usable was found.
pub const NO_IMAGES_MESSAGE: &str = "No suitable images found";

/// Names identifying one image-resolution unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSubject {
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
}

impl ImageSubject {
    #[must_use]
    pub fn new(common_name: Option<String>, scientific_name: Option<String>) -> Self {
        Self {
            common_name,
            scientific_name,
        }
    }

    #[must_use]
    pub fn from_animal(animal: &Animal) -> Self {
        Self {
            common_name: Some(animal.name.clone()),
            scientific_name: animal.scientific_name().map(str::to_string),
        }
    }

    /// Cache identity: the trimmed common name, else the trimmed scientific name.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        [&self.common_name, &self.scientific_name]
            .into_iter()
            .filter_map(|name| name.as_deref().map(str::trim))
            .find(|name| !name.is_empty())
    }
}

/// Pipeline stage, logged as the resolver advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    Idle,
    CheckingCache,
    Fetching,
    Scoring,
    Validating,
    Done,
    Failed,
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::CheckingCache => "checking_cache",
            Self::Fetching => "fetching",
            Self::Scoring => "scoring",
            Self::Validating => "validating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No subject was given; nothing happened.
    Idle,
    /// Candidates are available. `selected_url` is `None` when the top
    /// candidate failed validation or a cached failure was replayed.
    Resolved {
        selected_url: Option<String>,
        candidates: Vec<ImageCandidate>,
        from_cache: bool,
    },
    Failed { message: String },
}

impl Resolution {
    #[must_use]
    pub fn selected_url(&self) -> Option<&str> {
        match self {
            Self::Resolved { selected_url, .. } => selected_url.as_deref(),
            Self::Idle | Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[ImageCandidate] {
        match self {
            Self::Resolved { candidates, .. } => candidates,
            Self::Idle | Self::Failed { .. } => &[],
        }
    }
}

/// Composes search, scoring, validation and caching.
#[derive(Clone)]
pub struct ImageResolver {
    search: Arc<dyn ImageSearch>,
    validator: Arc<dyn ImageValidator>,
    cache: ImageCache,
}

impl fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn enter(phase: ResolutionPhase) {
    debug!(%phase, "resolution phase");
}

impl ImageResolver {
    #[must_use]
    pub fn new(search: Arc<dyn ImageSearch>, validator: Arc<dyn ImageValidator>, cache: ImageCache) -> Self {
        Self {
            search,
            validator,
            cache,
        }
    }

    /// Resolves the best image for `subject`.
    ///
    /// Every completed network resolution is cached, failures included.
    #[instrument(skip_all, fields(subject = subject.key().unwrap_or_default()))]
    pub async fn resolve(&self, subject: &ImageSubject) -> Resolution {
        let Some(key) = subject.key() else {
            enter(ResolutionPhase::Idle);
            return Resolution::Idle;
        };

        enter(ResolutionPhase::CheckingCache);
        if let Some(entry) = self.cache.get(key).await {
            enter(ResolutionPhase::Done);
            debug!(selected = entry.selected.is_some(), "image cache hit");
            return Resolution::Resolved {
                selected_url: entry.selected,
                candidates: entry.candidates,
                from_cache: true,
            };
        }

        enter(ResolutionPhase::Fetching);
        let queries = generate_queries(
            subject.common_name.as_deref(),
            subject.scientific_name.as_deref(),
        );
        let raw = fetch_all_candidates(self.search.as_ref(), &queries).await;

        enter(ResolutionPhase::Scoring);
        let scored = score_and_sort(raw);
        let Some(top) = scored.first() else {
            enter(ResolutionPhase::Failed);
            self.cache.put(key, None, Vec::new()).await;
            return Resolution::Failed {
                message: NO_IMAGES_MESSAGE.to_string(),
            };
        };

        enter(ResolutionPhase::Validating);
        let selected_url = self
            .validator
            .validate(&top.link)
            .await
            .then(|| top.link.clone());

        enter(ResolutionPhase::Done);
        info!(
            candidates = scored.len(),
            selected = selected_url.is_some(),
            "image resolved"
        );
        self.cache.put(key, selected_url.clone(), scored.clone()).await;
        Resolution::Resolved {
            selected_url,
            candidates: scored,
            from_cache: false,
        }
    }
}
