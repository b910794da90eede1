//! Resources: parsed JSON contents tagged with the specification that
//! governs them.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::pointer;
use crate::resolver::{Resolved, Resolver};
use crate::specification::{Anchor, Specification};

/// A JSON document together with the specification it is to be
/// interpreted under.
///
/// Cloning is cheap: contents are behind an `Arc` and never mutated.
#[derive(Clone, Debug)]
pub struct Resource {
    contents: Arc<Value>,
    specification: Specification,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.specification == other.specification && self.contents == other.contents
    }
}

impl Resource {
    pub(crate) fn from_parts(contents: Value, specification: Specification) -> Self {
        Resource {
            contents: Arc::new(contents),
            specification,
        }
    }

    /// Build a resource by detecting its specification from `$schema`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotDetermineSpecification`] when `$schema` is
    /// absent, not a string, or unrecognized.
    pub fn from_contents(contents: Value) -> Result<Self, Error> {
        let specification = Specification::detect(&contents)?;
        Ok(specification.create_resource(contents))
    }

    /// Build an opaque resource: one with no id, anchors, or
    /// subresources of its own.
    pub fn opaque(contents: Value) -> Self {
        Specification::OPAQUE.create_resource(contents)
    }

    pub fn contents(&self) -> &Value {
        &self.contents
    }

    pub(crate) fn contents_arc(&self) -> Arc<Value> {
        Arc::clone(&self.contents)
    }

    pub fn specification(&self) -> &Specification {
        &self.specification
    }

    /// This resource's internal identifier, if it declares one.
    pub fn id(&self) -> Option<&str> {
        self.specification.id_of(&self.contents)
    }

    /// The anchors this resource declares.
    pub fn anchors(&self) -> Vec<Anchor> {
        self.specification
            .anchor_descriptors(&self.contents)
            .into_iter()
            .map(|(name, dynamic)| Anchor::new(name, self.clone(), dynamic))
            .collect()
    }

    /// The child resources nested in this one.
    ///
    /// A child carrying its own recognized `$schema` switches dialect;
    /// otherwise it inherits this resource's. Boolean schemas are valid
    /// subschemas on newer drafts but declare nothing, so they are
    /// skipped.
    pub fn subresources(&self) -> impl Iterator<Item = Resource> + '_ {
        self.specification
            .subresources_of(&self.contents)
            .filter(|each| !each.is_boolean())
            .map(|each| {
                Specification::detect_with_default(each, self.specification)
                    .create_resource(each.clone())
            })
    }

    /// Resolve a JSON pointer within this resource.
    ///
    /// The empty pointer resolves to the resource itself. Stepping into a
    /// value that declares its own id re-bases the resolver, so `$ref`s
    /// inside the target keep resolving against the right URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PointerToNowhere`] when a step has no target.
    pub fn pointer(&self, pointer: &str, resolver: Resolver) -> Result<Resolved, Error> {
        if pointer.is_empty() {
            return Ok(Resolved::new(self.contents_arc(), resolver));
        }
        let mut contents = self.contents.as_ref();
        let mut resolver = resolver;
        for token in pointer::tokens(pointer) {
            contents = pointer::step(contents, &token).ok_or_else(|| Error::PointerToNowhere {
                reference: pointer.to_string(),
                resource: self.clone(),
            })?;
            resolver = resolver.in_subresource_id(self.specification.id_of(contents));
        }
        Ok(Resolved::new(Arc::new(contents.clone()), resolver))
    }
}
