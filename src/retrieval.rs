//! Adapters for plugging retrieval functions into a registry.
//!
//! The registry itself never fetches anything; these helpers build
//! [`Retrieve`] hooks out of simpler functions.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::error::BoxError;
use crate::registry::Retrieve;
use crate::resource::Resource;

/// Adapt a function producing JSON text into a [`Retrieve`] hook.
///
/// The text is parsed and run through [`Resource::from_contents`], and
/// results are memoized by URI, so wrapping an expensive fetch keeps it
/// to one call per URI even across unrelated registries.
pub fn cached_from_text<F>(fetch: F) -> Retrieve
where
    F: Fn(&str) -> Result<String, BoxError> + Send + Sync + 'static,
{
    let cache: Mutex<HashMap<String, Resource>> = Mutex::new(HashMap::new());
    Arc::new(move |uri: &str| {
        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resource) = cache.get(uri) {
            return Ok(resource.clone());
        }
        let text = fetch(uri)?;
        let contents: Value = serde_json::from_str(&text)?;
        let resource = Resource::from_contents(contents)?;
        cache.insert(uri.to_string(), resource.clone());
        Ok(resource)
    })
}

/// A [`Retrieve`] hook reading `root/<uri>` off the local filesystem.
///
/// URIs that would escape `root` (absolute paths, `..` components) are
/// refused.
pub fn filesystem(root: impl Into<PathBuf>) -> Retrieve {
    let root = root.into();
    Arc::new(move |uri: &str| {
        let relative = Path::new(uri);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(format!("{uri} escapes the retrieval root").into());
        }
        let text = std::fs::read_to_string(root.join(relative))?;
        let contents: Value = serde_json::from_str(&text)?;
        Resource::from_contents(contents).map_err(Into::into)
    })
}
