//! Specification descriptors: per-dialect rules for ids, anchors, and
//! subresources.
//!
//! A [`Specification`] is a plain record of three pure functions. The
//! JSON Schema dialects live in [`crate::jsonschema`]; anything else that
//! wants to participate in referencing can supply its own descriptor.

use std::fmt;
use std::iter;

use serde_json::Value;

use crate::error::Error;
use crate::jsonschema;
use crate::resource::Resource;

/// Extracts a resource's internal identifier, if it declares one.
pub type IdOf = for<'v> fn(&'v Value) -> Option<&'v str>;

/// Enumerates the anchors a resource declares, as `(name, is_dynamic)`
/// pairs.
pub type AnchorsIn = fn(&Value) -> Vec<(String, bool)>;

/// Enumerates the child values of a resource which are themselves
/// resources under the same specification.
pub type SubresourcesOf = for<'v> fn(&'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v>;

/// A referencing-defining specification.
///
/// Descriptors are process-lifetime constants; two specifications are
/// equal when their names are.
#[derive(Clone, Copy)]
pub struct Specification {
    name: &'static str,
    dialect_id: &'static str,
    id_of: IdOf,
    anchors_in: AnchorsIn,
    subresources_of: SubresourcesOf,
}

impl Specification {
    /// A specification under which resources are opaque: no ids, no
    /// anchors, no subresources.
    pub const OPAQUE: Specification = Specification::new(
        "opaque",
        "",
        opaque_id,
        opaque_anchors,
        opaque_subresources,
    );

    /// Assemble a descriptor from its parts.
    ///
    /// `dialect_id` is the meta-schema URI identifying the dialect; pass
    /// `""` for specifications that have none.
    pub const fn new(
        name: &'static str,
        dialect_id: &'static str,
        id_of: IdOf,
        anchors_in: AnchorsIn,
        subresources_of: SubresourcesOf,
    ) -> Self {
        Specification {
            name,
            dialect_id,
            id_of,
            anchors_in,
            subresources_of,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The meta-schema URI identifying this dialect, if it has one.
    pub fn dialect_id(&self) -> Option<&'static str> {
        (!self.dialect_id.is_empty()).then_some(self.dialect_id)
    }

    /// Detect the specification governing `contents` from its `$schema`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CannotDetermineSpecification`] when `$schema` is
    /// absent, not a string, or names an unknown dialect.
    pub fn detect(contents: &Value) -> Result<Specification, Error> {
        let dialect = contents
            .get("$schema")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::CannotDetermineSpecification {
                contents: contents.clone(),
            })?;
        jsonschema::specification_with(dialect).map_err(|_| {
            Error::CannotDetermineSpecification {
                contents: contents.clone(),
            }
        })
    }

    /// Like [`Specification::detect`], falling back to `default` when
    /// detection finds nothing usable. Subresource walks use this so a
    /// child without (or with an unknown) `$schema` inherits its parent's
    /// dialect.
    pub(crate) fn detect_with_default(contents: &Value, default: Specification) -> Specification {
        match contents.get("$schema").and_then(Value::as_str) {
            Some(dialect) => jsonschema::specification_with(dialect).unwrap_or(default),
            None => default,
        }
    }

    /// Build a resource governed by this specification, bypassing
    /// detection.
    pub fn create_resource(&self, contents: Value) -> Resource {
        Resource::from_parts(contents, *self)
    }

    /// The internal identifier `contents` declares under this
    /// specification, if any.
    pub fn id_of<'v>(&self, contents: &'v Value) -> Option<&'v str> {
        (self.id_of)(contents)
    }

    /// The anchors `contents` declares, each carrying a resource built
    /// from `contents`.
    pub fn anchors_in(&self, contents: &Value) -> Vec<Anchor> {
        let declared = (self.anchors_in)(contents);
        if declared.is_empty() {
            return Vec::new();
        }
        let resource = self.create_resource(contents.clone());
        declared
            .into_iter()
            .map(|(name, dynamic)| Anchor::new(name, resource.clone(), dynamic))
            .collect()
    }

    /// The declared anchors of `contents` as raw `(name, is_dynamic)`
    /// pairs, without materializing resources.
    pub(crate) fn anchor_descriptors(&self, contents: &Value) -> Vec<(String, bool)> {
        (self.anchors_in)(contents)
    }

    /// The child values of `contents` which are themselves resources.
    pub fn subresources_of<'v>(
        &self,
        contents: &'v Value,
    ) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
        (self.subresources_of)(contents)
    }
}

impl fmt::Debug for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Specification {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Specification {}

fn opaque_id(_contents: &Value) -> Option<&str> {
    None
}

fn opaque_anchors(_contents: &Value) -> Vec<(String, bool)> {
    Vec::new()
}

fn opaque_subresources<'v>(_contents: &'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    Box::new(iter::empty())
}

/// A named location within a resource.
///
/// Dynamic anchors (2020-12 `$dynamicAnchor`) carry a flag that makes
/// them participate in the dynamic-scope walk at resolution time.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    name: String,
    resource: Resource,
    dynamic: bool,
}

impl Anchor {
    pub(crate) fn new(name: String, resource: Resource, dynamic: bool) -> Self {
        Anchor {
            name,
            resource,
            dynamic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resource this anchor is declared in (and points to).
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}
