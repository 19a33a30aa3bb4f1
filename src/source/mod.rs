//! Animal data source: fetches records by name prefix from a remote API.
//!
//! # Overview
//!
//! - [`AnimalDataSource`] - Async trait for prefix lookups
//! - [`NinjasClient`] - HTTP implementation
//! - [`load_all`] - Concurrent fan-out over many prefixes, failure tolerant

mod error;
mod ninjas;

pub use error::SourceError;
pub use ninjas::NinjasClient;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{info, instrument, warn};

use crate::catalog::Animal;

/// Prefixes used for a full catalog load.
pub const LETTERS: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

/// Source of animal records.
#[async_trait]
pub trait AnimalDataSource: Send + Sync {
    /// Returns every animal whose name matches `prefix`.
    async fn fetch_by_prefix(&self, prefix: &str) -> Result<Vec<Animal>, SourceError>;
}

/// Fetches every prefix concurrently and flattens the results in prefix order.
///
/// A prefix that fails contributes no records; the failure is logged.
/// `on_prefix_done` is called once per finished prefix, in completion order.
#[instrument(skip(source, prefixes, on_prefix_done), fields(prefixes = prefixes.len()))]
pub async fn load_all<F>(source: &dyn AnimalDataSource, prefixes: &[&str], on_prefix_done: F) -> Vec<Animal>
where
    F: Fn(&str) + Sync,
{
    let on_prefix_done = &on_prefix_done;
    let batches = join_all(prefixes.iter().map(|prefix| async move {
        let prefix: &str = prefix;
        let result = source.fetch_by_prefix(prefix).await;
        on_prefix_done(prefix);
        match result {
            Ok(animals) => animals,
            Err(error) => {
                warn!(prefix, error = %error, "prefix fetch failed; continuing without it");
                Vec::new()
            }
        }
    }))
    .await;

    let animals: Vec<Animal> = batches.into_iter().flatten().collect();
    info!(count = animals.len(), "loaded animals");
    animals
}
