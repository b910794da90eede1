//! Reference resolution: base-URI tracking, fragment dispatch, and the
//! dynamic scope.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::registry::Registry;
use crate::resource::Resource;
use crate::specification::Anchor;
use crate::uri::{self, FragmentKind};

/// A persistent stack of the base URIs entered during a resolution
/// chain, innermost first. Pushing shares the tail, so every resolver
/// along a chain keeps its own view for free.
#[derive(Clone, Debug, Default)]
struct Scope(Option<Arc<Frame>>);

#[derive(Debug)]
struct Frame {
    uri: String,
    outer: Scope,
}

impl Scope {
    fn push(&self, uri: String) -> Scope {
        Scope(Some(Arc::new(Frame {
            uri,
            outer: self.clone(),
        })))
    }

    fn innermost(&self) -> Option<&str> {
        self.0.as_deref().map(|frame| frame.uri.as_str())
    }

    fn outermost_first(&self) -> Vec<&str> {
        let mut uris = Vec::new();
        let mut cursor = self;
        while let Some(frame) = cursor.0.as_deref() {
            uris.push(frame.uri.as_str());
            cursor = &frame.outer;
        }
        uris.reverse();
        uris
    }
}

/// A value-semantic resolution context: a base URI, the registry to look
/// things up in, and the dynamic scope accumulated so far.
///
/// Every hop produces a new resolver; existing ones are never affected.
#[derive(Clone, Debug)]
pub struct Resolver {
    base_uri: String,
    registry: Registry,
    previous: Scope,
}

impl Resolver {
    pub(crate) fn new(base_uri: String, registry: Registry) -> Self {
        Resolver {
            base_uri,
            registry,
            previous: Scope::default(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve `reference` against this resolver's base URI.
    ///
    /// The joined URI's resource is fetched (retrieving it if need be),
    /// then the fragment picks the node: none or empty means the root, a
    /// JSON pointer walks the contents, and a plain name consults the
    /// anchor index, following dynamic anchors through the scope.
    ///
    /// # Errors
    ///
    /// Any of the registry's lookup errors, [`Error::PointerToNowhere`]
    /// for dead pointers, or [`Error::InvalidAnchor`] for fragments that
    /// are neither pointers nor plain names.
    pub fn lookup(&self, reference: &str) -> Result<Resolved, Error> {
        let (uri, fragment) = if let Some(fragment) = reference.strip_prefix('#') {
            (self.base_uri.clone(), Some(fragment.to_string()))
        } else {
            let joined = uri::join(&self.base_uri, reference);
            let (absolute, fragment) = uri::defrag(&joined);
            (absolute.to_string(), fragment.map(str::to_string))
        };
        let retrieved = self.registry.get_or_retrieve(&uri)?;
        match uri::fragment_kind(fragment.as_deref()) {
            FragmentKind::None | FragmentKind::Empty => {
                let contents = retrieved.value.contents_arc();
                let resolver = self.evolve(uri, retrieved.registry);
                Ok(Resolved::new(contents, resolver))
            }
            FragmentKind::Pointer => {
                let pointer = fragment.unwrap_or_default();
                let resolver = self.evolve(uri, retrieved.registry);
                retrieved.value.pointer(&pointer, resolver)
            }
            FragmentKind::Anchor => {
                let name = fragment.unwrap_or_default();
                let anchored = retrieved.registry.anchor(&uri, &name)?;
                let resolver = self.evolve(uri, anchored.registry);
                resolver.resolve_anchor(&anchored.value)
            }
            FragmentKind::Invalid => {
                Err(Error::invalid_anchor(uri, fragment.as_deref().unwrap_or("")))
            }
        }
    }

    /// Re-base this resolver inside `subresource`, extending the dynamic
    /// scope when the subresource declares its own id.
    pub fn in_subresource(&self, subresource: &Resource) -> Resolver {
        self.in_subresource_id(subresource.id())
    }

    pub(crate) fn in_subresource_id(&self, id: Option<&str>) -> Resolver {
        match id {
            Some(id) => {
                let base_uri = uri::join(&self.base_uri, id);
                self.evolve(base_uri, self.registry.clone())
            }
            None => self.clone(),
        }
    }

    /// The dynamic scope: `(uri, resource)` frames entered on the way
    /// here, outermost first, omitting the current (innermost) frame.
    pub fn dynamic_scope(&self) -> Vec<(String, Resource)> {
        self.previous
            .outermost_first()
            .into_iter()
            .filter_map(|uri| {
                self.registry
                    .get(uri)
                    .cloned()
                    .map(|resource| (uri.to_string(), resource))
            })
            .collect()
    }

    /// Move to a new base, recording the old one in the scope unless it
    /// is empty or already innermost.
    fn evolve(&self, base_uri: String, registry: Registry) -> Resolver {
        let mut previous = self.previous.clone();
        if !self.base_uri.is_empty() && previous.innermost() != Some(self.base_uri.as_str()) {
            previous = previous.push(self.base_uri.clone());
        }
        Resolver {
            base_uri,
            registry,
            previous,
        }
    }

    /// Produce the resolved view of a located anchor.
    ///
    /// A dynamic anchor is not used directly: the outermost scope frame
    /// declaring a dynamic anchor of the same name wins, falling back to
    /// the located one when no frame does.
    fn resolve_anchor(self, anchor: &Anchor) -> Result<Resolved, Error> {
        if !anchor.is_dynamic() {
            return Ok(Resolved::new(anchor.resource().contents_arc(), self));
        }
        let mut target = anchor.resource().clone();
        for uri in self.previous.outermost_first() {
            if let Ok(outer) = self.registry.anchor(uri, anchor.name()) {
                if outer.value.is_dynamic() {
                    target = outer.value.resource().clone();
                    break;
                }
            }
        }
        Ok(Resolved::new(target.contents_arc(), self))
    }
}

/// The outcome of a lookup: the referenced contents and a resolver
/// positioned at the target, ready for further resolution from there.
#[derive(Clone, Debug)]
pub struct Resolved {
    contents: Arc<Value>,
    resolver: Resolver,
}

impl Resolved {
    pub(crate) fn new(contents: Arc<Value>, resolver: Resolver) -> Self {
        Resolved { contents, resolver }
    }

    pub fn contents(&self) -> &Value {
        &self.contents
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonschema::DRAFT202012;
    use crate::registry::Registry;
    use serde_json::json;

    fn registry_with(uri: &str, contents: Value) -> Registry {
        Registry::new()
            .with_resource(uri, DRAFT202012.create_resource(contents))
            .unwrap()
    }

    #[test]
    fn lookup_without_fragment_returns_the_root() {
        let registry = registry_with("urn:example:a", json!({"type": "integer"}));
        let resolved = registry.resolver("").lookup("urn:example:a").unwrap();
        assert_eq!(resolved.contents(), &json!({"type": "integer"}));
        assert_eq!(resolved.resolver().base_uri(), "urn:example:a");
    }

    #[test]
    fn empty_fragment_resolves_like_no_fragment() {
        let registry = registry_with("urn:example:a", json!({"type": "integer"}));
        let resolver = registry.resolver("");
        assert_eq!(
            resolver.lookup("urn:example:a").unwrap().contents(),
            resolver.lookup("urn:example:a#").unwrap().contents(),
        );
    }

    #[test]
    fn fragment_only_reference_resolves_against_the_base() {
        let registry = registry_with("urn:example:a", json!({"$defs": {"n": {"type": "null"}}}));
        let based = registry.resolver("urn:example:a");
        let resolved = based.lookup("#/$defs/n").unwrap();
        assert_eq!(resolved.contents(), &json!({"type": "null"}));
    }

    #[test]
    fn lookup_of_unknown_uri_fails() {
        let resolver = Registry::new().resolver("");
        assert!(matches!(
            resolver.lookup("urn:example:absent"),
            Err(Error::NoSuchResource { .. })
        ));
    }

    #[test]
    fn invalid_fragment_reports_a_suggestion() {
        let registry = registry_with("urn:example:a", json!({}));
        let result = registry.resolver("").lookup("urn:example:a#foo/bar");
        assert!(matches!(
            result,
            Err(Error::InvalidAnchor { suggestion, .. }) if suggestion == "#/foo/bar"
        ));
    }

    #[test]
    fn scope_does_not_duplicate_the_innermost_frame() {
        let registry = registry_with(
            "urn:example:a",
            json!({"$defs": {"n": {"type": "null"}}}),
        );
        let first = registry.resolver("").lookup("urn:example:a").unwrap();
        // a same-resource hop must not stack a second frame for it
        let second = first.resolver().lookup("#/$defs/n").unwrap();
        let scope = second.resolver().dynamic_scope();
        assert_eq!(scope.len(), 1);
        assert_eq!(scope[0].0, "urn:example:a");
    }

    #[test]
    fn dynamic_scope_is_outermost_first_without_the_current_frame() {
        let registry = Registry::new()
            .with_resources([
                ("urn:example:o", DRAFT202012.create_resource(json!({"title": "outer"}))),
                ("urn:example:i", DRAFT202012.create_resource(json!({"title": "inner"}))),
            ])
            .unwrap();
        let outer = registry.resolver("").lookup("urn:example:o").unwrap();
        let inner = outer.resolver().lookup("urn:example:i").unwrap();
        let scope = inner.resolver().dynamic_scope();
        assert_eq!(
            scope.iter().map(|(uri, _)| uri.as_str()).collect::<Vec<_>>(),
            vec!["urn:example:o"],
        );
    }

    #[test]
    fn in_subresource_rebases_only_for_ids() {
        let registry = registry_with("http://example.com/root", json!({}));
        let resolver = registry.resolver("http://example.com/root");

        let plain = DRAFT202012.create_resource(json!({"type": "object"}));
        assert_eq!(resolver.in_subresource(&plain).base_uri(), "http://example.com/root");

        let identified = DRAFT202012.create_resource(json!({"$id": "nested"}));
        assert_eq!(
            resolver.in_subresource(&identified).base_uri(),
            "http://example.com/nested"
        );
    }
}
