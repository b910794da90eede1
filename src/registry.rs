//! The immutable resource registry and its crawl/indexing machinery.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{BoxError, Error};
use crate::resolver::Resolver;
use crate::resource::Resource;
use crate::specification::{Anchor, Specification};
use crate::uri;

/// A hook invoked when a URI is requested that the registry does not
/// hold. Its result is cached into the derived registry the lookup
/// returns.
pub type Retrieve = Arc<dyn Fn(&str) -> Result<Resource, BoxError> + Send + Sync>;

/// A value looked up from a registry, paired with the (possibly derived)
/// registry that produced it.
///
/// Lookups may crawl or invoke the retrieve hook; the work they do is
/// preserved in `registry`, so chains of lookups should carry it forward.
#[derive(Clone, Debug)]
pub struct Retrieved<T> {
    pub registry: Registry,
    pub value: T,
}

/// An immutable mapping from URI to [`Resource`], with an anchor index.
///
/// Every `with_*` operation returns a new registry; the receiver is
/// observationally unchanged. Snapshots share all unchanged substructure,
/// so registries are cheap to clone and safe to share across threads.
#[derive(Clone, Default)]
pub struct Registry {
    resources: Arc<HashMap<String, Resource>>,
    anchors: Arc<HashMap<(String, String), Anchor>>,
    uncrawled: Arc<HashSet<String>>,
    retrieve: Option<Retrieve>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Registry ({} resources)>", self.resources.len())
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Attach a retrieve hook, consulted by lookups for unknown URIs.
    pub fn with_retrieve(mut self, retrieve: Retrieve) -> Self {
        self.retrieve = Some(retrieve);
        self
    }

    /// The number of registered (or so-far-discovered) resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterate over `(uri, resource)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(uri, resource)| (uri.as_str(), resource))
    }

    /// The resource registered (or discovered) at `uri`, if any.
    ///
    /// Plain map access: no crawling, no retrieval.
    pub fn get(&self, uri: &str) -> Option<&Resource> {
        self.resources.get(uri::normalize(uri).as_str())
    }

    /// The contents of the resource at `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchResource`] when nothing is registered
    /// there.
    pub fn contents(&self, uri: &str) -> Result<&Value, Error> {
        self.get(uri)
            .map(Resource::contents)
            .ok_or_else(|| Error::NoSuchResource { uri: uri.to_string() })
    }

    /// Register one resource under `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateResource`] when `uri` already maps to a
    /// differing resource. Re-registering identical contents is a no-op.
    pub fn with_resource(&self, uri: impl Into<String>, resource: Resource) -> Result<Registry, Error> {
        self.with_resources([(uri.into(), resource)])
    }

    /// Register many `(uri, resource)` pairs at once.
    ///
    /// # Errors
    ///
    /// As [`Registry::with_resource`].
    pub fn with_resources<U>(
        &self,
        pairs: impl IntoIterator<Item = (U, Resource)>,
    ) -> Result<Registry, Error>
    where
        U: Into<String>,
    {
        let mut resources = (*self.resources).clone();
        let mut uncrawled = (*self.uncrawled).clone();
        for (uri, resource) in pairs {
            let uri = uri::normalize(&uri.into());
            match resources.get(&uri) {
                Some(existing) if *existing == resource => continue,
                Some(_) => return Err(Error::DuplicateResource { uri }),
                None => {}
            }
            uncrawled.insert(uri.clone());
            resources.insert(uri, resource);
        }
        Ok(Registry {
            resources: Arc::new(resources),
            anchors: Arc::clone(&self.anchors),
            uncrawled: Arc::new(uncrawled),
            retrieve: self.retrieve.clone(),
        })
    }

    /// Register many `(uri, contents)` pairs, detecting each
    /// specification from `$schema`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotDetermineSpecification`] for undetectable
    /// contents, or [`Error::DuplicateResource`] on collision.
    pub fn with_contents<U>(
        &self,
        pairs: impl IntoIterator<Item = (U, Value)>,
    ) -> Result<Registry, Error>
    where
        U: Into<String>,
    {
        let mut identified = Vec::new();
        for (uri, contents) in pairs {
            identified.push((uri.into(), Resource::from_contents(contents)?));
        }
        self.with_resources(identified)
    }

    /// Register a resource under the URI its own id declares.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoInternalId`] when the resource has no id, or
    /// [`Error::DuplicateResource`] on collision.
    pub fn with_identified(&self, resource: Resource) -> Result<Registry, Error> {
        let id = resource.id().map(str::to_string);
        match id {
            Some(id) => self.with_resource(id, resource),
            None => Err(Error::NoInternalId { resource }),
        }
    }

    /// Register several resources, each under the URI its own id
    /// declares.
    ///
    /// # Errors
    ///
    /// As [`Registry::with_identified`].
    pub fn with_identified_resources(
        &self,
        resources: impl IntoIterator<Item = Resource>,
    ) -> Result<Registry, Error> {
        let mut pairs = Vec::new();
        for resource in resources {
            let id = resource.id().map(str::to_string);
            match id {
                Some(id) => pairs.push((id, resource)),
                None => return Err(Error::NoInternalId { resource }),
            }
        }
        self.with_resources(pairs)
    }

    /// Overwriting insert used internally where the original contents
    /// are authoritative (retrieve caching, root placement).
    pub(crate) fn with_resource_unchecked(&self, uri: &str, resource: Resource) -> Registry {
        let uri = uri::normalize(uri);
        let mut resources = (*self.resources).clone();
        let mut uncrawled = (*self.uncrawled).clone();
        uncrawled.insert(uri.clone());
        resources.insert(uri, resource);
        Registry {
            resources: Arc::new(resources),
            anchors: Arc::clone(&self.anchors),
            uncrawled: Arc::new(uncrawled),
            retrieve: self.retrieve.clone(),
        }
    }

    /// Walk every not-yet-crawled resource, discovering nested resources
    /// (children with their own ids) and indexing every anchor.
    ///
    /// Crawling is idempotent; a crawled registry returns itself.
    pub fn crawl(&self) -> Registry {
        if self.uncrawled.is_empty() {
            return self.clone();
        }
        let mut resources = (*self.resources).clone();
        let mut anchors = (*self.anchors).clone();
        for uri in self.uncrawled.iter() {
            if let Some(resource) = self.resources.get(uri) {
                crawl_contents(
                    uri,
                    uri,
                    resource.contents(),
                    *resource.specification(),
                    Some(resource),
                    &mut resources,
                    &mut anchors,
                );
            }
        }
        Registry {
            resources: Arc::new(resources),
            anchors: Arc::new(anchors),
            uncrawled: Arc::new(HashSet::new()),
            retrieve: self.retrieve.clone(),
        }
    }

    /// Fetch the resource at `uri`, crawling on a miss and then falling
    /// back to the retrieve hook.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchResource`] when the URI is unknown and no
    /// hook is configured, or [`Error::Unretrievable`] when the hook
    /// fails.
    pub fn get_or_retrieve(&self, uri: &str) -> Result<Retrieved<Resource>, Error> {
        let key = uri::normalize(uri);
        if let Some(resource) = self.resources.get(&key) {
            return Ok(Retrieved {
                registry: self.clone(),
                value: resource.clone(),
            });
        }
        let registry = self.crawl();
        if let Some(resource) = registry.resources.get(&key) {
            let value = resource.clone();
            return Ok(Retrieved { registry, value });
        }
        let Some(retrieve) = registry.retrieve.as_deref() else {
            return Err(Error::NoSuchResource { uri: key });
        };
        match retrieve(&key) {
            Ok(resource) => {
                let registry = registry.with_resource_unchecked(&key, resource.clone());
                Ok(Retrieved {
                    registry,
                    value: resource,
                })
            }
            Err(source) => Err(Error::Unretrievable { uri: key, source }),
        }
    }

    /// Look up the anchor `name` within the resource at `uri`, crawling
    /// first if that resource has not been indexed yet.
    ///
    /// Anchors of a resource registered under a non-canonical URI also
    /// resolve through the canonical URI its own id declares.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAnchor`] for names containing `/`, and
    /// [`Error::NoSuchAnchor`] otherwise.
    pub fn anchor(&self, uri: &str, name: &str) -> Result<Retrieved<Anchor>, Error> {
        let uri = uri::normalize(uri);
        let key = (uri.clone(), name.to_string());
        if let Some(anchor) = self.anchors.get(&key) {
            return Ok(Retrieved {
                registry: self.clone(),
                value: anchor.clone(),
            });
        }
        let registry = self.crawl();
        if let Some(anchor) = registry.anchors.get(&key) {
            let value = anchor.clone();
            return Ok(Retrieved { registry, value });
        }
        let canonical_id = registry
            .resources
            .get(&uri)
            .and_then(Resource::id)
            .map(str::to_string);
        if let Some(id) = canonical_id {
            let canonical = uri::join(&uri, &id);
            if canonical != uri {
                if let Some(anchor) = registry.anchors.get(&(canonical, name.to_string())) {
                    let value = anchor.clone();
                    return Ok(Retrieved { registry, value });
                }
            }
        }
        if name.contains('/') {
            return Err(Error::invalid_anchor(uri, name));
        }
        Err(Error::NoSuchAnchor {
            uri,
            anchor: name.to_string(),
        })
    }

    /// A resolver positioned at `base_uri` over this registry.
    pub fn resolver(&self, base_uri: impl Into<String>) -> Resolver {
        Resolver::new(uri::normalize(&base_uri.into()), self.clone())
    }

    /// A resolver rooted at `resource`, pre-placing it at the URI its id
    /// declares, or at the empty (anonymous) URI if it has none.
    pub fn resolver_with_root(&self, resource: Resource) -> Resolver {
        let base_uri = uri::normalize(resource.id().unwrap_or(""));
        let registry = self.with_resource_unchecked(&base_uri, resource);
        Resolver::new(base_uri, registry)
    }

    /// Merge two registries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateResource`] when the same URI maps to
    /// differing resources.
    pub fn combine(&self, other: &Registry) -> Result<Registry, Error> {
        let mut resources = (*self.resources).clone();
        let mut uncrawled = (*self.uncrawled).clone();
        for (uri, resource) in other.resources.iter() {
            match resources.get(uri) {
                Some(existing) if existing != resource => {
                    return Err(Error::DuplicateResource { uri: uri.clone() });
                }
                _ => {}
            }
            resources.insert(uri.clone(), resource.clone());
        }
        let mut anchors = (*self.anchors).clone();
        anchors.extend(other.anchors.iter().map(|(key, anchor)| (key.clone(), anchor.clone())));
        uncrawled.extend(other.uncrawled.iter().cloned());
        Ok(Registry {
            resources: Arc::new(resources),
            anchors: Arc::new(anchors),
            uncrawled: Arc::new(uncrawled),
            retrieve: other.retrieve.clone().or_else(|| self.retrieve.clone()),
        })
    }
}

/// Walk one resource's contents, registering every nested id under the
/// URI joined against its enclosing URI and indexing every anchor found
/// along the way.
///
/// A relative nested id joins against the enclosing id's URI when that
/// URI is hierarchical; an opaque enclosing URI (`urn:`-style ids cannot
/// absorb relative references) falls back to `registration_uri`, the URI
/// the crawl root was registered under.
///
/// Resources are only materialized for nodes that carry an id or declare
/// anchors; plain interior nodes are walked by reference.
fn crawl_contents(
    base_uri: &str,
    registration_uri: &str,
    contents: &Value,
    specification: Specification,
    existing: Option<&Resource>,
    resources: &mut HashMap<String, Resource>,
    anchors: &mut HashMap<(String, String), Anchor>,
) {
    let mut materialized = existing.cloned();
    let uri = match specification.id_of(contents) {
        Some(id) => {
            let joined = uri::try_join(base_uri, id)
                .or_else(|| uri::try_join(registration_uri, id))
                .unwrap_or_else(|| id.to_string());
            let resource = materialized
                .get_or_insert_with(|| specification.create_resource(contents.clone()))
                .clone();
            resources.insert(joined.clone(), resource);
            joined
        }
        None => base_uri.to_string(),
    };
    let declared = specification.anchor_descriptors(contents);
    if !declared.is_empty() {
        let resource = materialized
            .get_or_insert_with(|| specification.create_resource(contents.clone()))
            .clone();
        for (name, dynamic) in declared {
            anchors.insert(
                (uri.clone(), name.clone()),
                Anchor::new(name, resource.clone(), dynamic),
            );
        }
    }
    for subresource in specification.subresources_of(contents) {
        if subresource.is_boolean() {
            continue;
        }
        let subspecification = Specification::detect_with_default(subresource, specification);
        crawl_contents(
            &uri,
            registration_uri,
            subresource,
            subspecification,
            None,
            resources,
            anchors,
        );
    }
}
