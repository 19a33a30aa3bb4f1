//! Animal Catalog Core Library
//!
//! Core functionality for the animal catalog: loading animal records from a
//! remote API, keeping a device-local catalog with favorites, and resolving a
//! reference photo for each animal.
//!
//! # Architecture
//!
//! - [`catalog`] - Animal records, favorites and their persistence
//! - [`source`] - Remote animal data source
//! - [`image`] - Image search, ranking, validation and caching
//! - [`store`] - Key-value persistence backends
//! - [`db`] - `SQLite` connection and schema management
//! - [`retry`] - Shared retry policy for network calls
//! - [`http_client`] - Shared HTTP client construction

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod clock;
pub mod db;
pub mod http_client;
pub mod image;
pub mod retry;
pub mod source;
pub mod store;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use catalog::{Animal, AnimalDraft, Catalog, CatalogError, CatalogState};
pub use db::{Database, DatabaseOptions, DbError};
pub use http_client::HttpTimeouts;
pub use image::{
    GoogleImageSearch, HttpImageValidator, ImageCache, ImageCandidate, ImageResolver, ImageSession,
    ImageSubject, ImageView, Resolution, SearchConfig,
};
pub use retry::{Backoff, FailureType, RetryPolicy, Retryable};
pub use source::{AnimalDataSource, LETTERS, NinjasClient, SourceError, load_all};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, StoreError};
