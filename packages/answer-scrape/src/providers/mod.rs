//! Scrape provider implementations.
//!
//! Each vendor implements [`ScrapeProvider`](crate::traits::provider::ScrapeProvider);
//! the registry below is the only place a vendor name is branched on.

pub mod dataforseo;
pub mod oxylabs;

pub use dataforseo::DataForSeoProvider;
pub use oxylabs::OxylabsProvider;

use serde_json::Value;

use crate::error::{Result, ScrapeError};
use crate::traits::provider::ScrapeProvider;
use crate::types::model::SearchSource;

/// Build a provider by name, reading its credentials from the environment.
pub fn from_name(name: &str) -> Result<Box<dyn ScrapeProvider>> {
    match name {
        "dataforseo" => Ok(Box::new(DataForSeoProvider::from_env()?)),
        "oxylabs" => Ok(Box::new(OxylabsProvider::from_env()?)),
        other => Err(ScrapeError::UnknownProvider {
            name: other.to_string(),
        }),
    }
}

/// Pick the first result entry, failing only when the payload is
/// structurally absent (null or an empty array).
pub(crate) fn first_result_entry(raw: &Value) -> Result<&Value> {
    match raw {
        Value::Null => Err(ScrapeError::MalformedPayload(
            "null result payload".to_string(),
        )),
        Value::Array(items) => items
            .first()
            .ok_or_else(|| ScrapeError::MalformedPayload("empty result payload".to_string())),
        other => Ok(other),
    }
}

/// Copy the search snippet onto a cited source with the same URL.
pub(crate) fn search_snippet_for(search_sources: &[SearchSource], url: &str) -> Option<String> {
    search_sources
        .iter()
        .find(|s| s.url == url)
        .and_then(|s| s.snippet.clone())
}
