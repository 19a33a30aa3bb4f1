//! Image resolution pipeline.
//!
//! Given an animal's common and scientific names, finds one displayable image:
//!
//! 1. [`generate_queries`] expands the names into ranked search queries
//! 2. [`fetch_all_candidates`] runs them through an [`ImageSearch`] backend
//! 3. [`score_and_sort`] filters and ranks the results
//! 4. an [`ImageValidator`] checks the top candidate is loadable
//! 5. [`ImageCache`] remembers the outcome for 24 hours
//!
//! [`ImageResolver`] composes the steps and [`ImageSession`] adds
//! per-subject cancellation for interactive callers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use animal_catalog_core::http_client::HttpTimeouts;
//! use animal_catalog_core::image::{
//!     GoogleImageSearch, HttpImageValidator, ImageCache, ImageResolver, ImageSubject, SearchConfig,
//! };
//! use animal_catalog_core::store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let timeouts = HttpTimeouts::default();
//! let resolver = ImageResolver::new(
//!     Arc::new(GoogleImageSearch::new(SearchConfig::new("key", "cx"), timeouts)?),
//!     Arc::new(HttpImageValidator::new(timeouts)?),
//!     ImageCache::new(Arc::new(MemoryStore::new())),
//! );
//! let subject = ImageSubject::new(Some("Lion".into()), Some("Panthera leo".into()));
//! let resolution = resolver.resolve(&subject).await;
//! println!("{:?}", resolution.selected_url());
//! # Ok(())
//! # }
//! ```

mod cache;
mod candidate;
mod error;
mod query;
mod resolver;
mod score;
mod search;
mod session;
mod validate;

pub use cache::{CACHE_TTL_MS, ImageCache, cache_key};
pub use candidate::{CacheEntry, ImageCandidate, ImageDimensions};
pub use error::ImageError;
pub use query::generate_queries;
pub use resolver::{ImageResolver, ImageSubject, NO_IMAGES_MESSAGE, Resolution, ResolutionPhase};
pub use score::{ALLOWED_EXTENSIONS, HOST_PRIORITIES, has_allowed_extension, score_and_sort, score_candidate};
pub use search::{
    DEFAULT_SEARCH_BASE_URL, GoogleImageSearch, ImageSearch, MAX_CANDIDATES, SearchConfig,
    fetch_all_candidates,
};
pub use session::{ImageSession, ImageView};
pub use validate::{FALLBACK_TIMEOUT, HttpImageValidator, ImageValidator};
