//! Shared User-Agent string for outbound HTTP clients.
//!
//! Search, catalog and validation traffic all identify the tool the same way.

/// Product token used in every User-Agent.
const PRODUCT: &str = "animal-catalog";

/// Default User-Agent for every outbound request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (catalog-browser)")
}
