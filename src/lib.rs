//! Cross-dialect JSON reference resolution.
//!
//! This library resolves references between JSON documents ("resources"),
//! primarily in service of JSON Schema tooling implementing `$ref` and
//! `$dynamicRef` across drafts 4 through 2020-12. Resources are
//! registered in an immutable [`Registry`]; a [`Resolver`] answers
//! lookups of the form "resolve this URI against this base", producing
//! the referenced sub-document along with the context needed to keep
//! resolving from there.
//!
//! # Example
//!
//! ```
//! use json_referencing::{Registry, Resource};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "$id": "urn:example:schema",
//!     "$schema": "https://json-schema.org/draft/2020-12/schema",
//!     "$defs": {
//!         "count": { "$anchor": "count", "type": "integer", "minimum": 0 }
//!     }
//! });
//! let resource = Resource::from_contents(schema).unwrap();
//! let registry = Registry::new()
//!     .with_resource("urn:example:schema", resource)
//!     .unwrap();
//!
//! // By JSON pointer...
//! let resolver = registry.resolver("");
//! let resolved = resolver.lookup("urn:example:schema#/$defs/count").unwrap();
//! assert_eq!(resolved.contents()["type"], "integer");
//!
//! // ...or by plain-name anchor.
//! let resolved = resolver.lookup("urn:example:schema#count").unwrap();
//! assert_eq!(resolved.contents()["minimum"], 0);
//! ```
//!
//! Registries, resolvers, and resolved views are values with structural
//! sharing: deriving a new one never disturbs the old, and everything is
//! safe to share across threads. Resolution of a URI the registry does
//! not hold can be delegated to a caller-supplied [`Retrieve`] hook; see
//! [`retrieval`] for adapters. Nothing here validates schemas or touches
//! the network.

mod error;
mod pointer;
mod registry;
mod resolver;
mod resource;
mod specification;
mod uri;

pub mod jsonschema;
pub mod retrieval;

pub use error::{BoxError, Error};
pub use registry::{Registry, Retrieve, Retrieved};
pub use resolver::{Resolved, Resolver};
pub use resource::Resource;
pub use specification::{Anchor, AnchorsIn, IdOf, Specification, SubresourcesOf};
