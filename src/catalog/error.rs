//! Error types for catalog operations.

use thiserror::Error;

/// Errors surfaced by the catalog.
///
/// Persistence failures are not represented here; they are logged and the
/// in-memory state stays authoritative.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A manual add was submitted without a name.
    #[error("animal name is required\n  Suggestion: Provide a non-blank --name")]
    EmptyName,

    /// The named animal is not in the catalog.
    #[error("animal not found: '{0}'\n  Suggestion: Run `refresh` or check the spelling with `list`")]
    NotFound(String),
}
