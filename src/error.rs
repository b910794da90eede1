//! Error types for registration, indexing, and reference resolution.

use serde_json::Value;
use thiserror::Error;

use crate::resource::Resource;

/// A boxed error suitable for crossing the retrieve-hook boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Everything that can go wrong while registering or resolving resources.
///
/// Equality compares only the identifying fields (URIs, anchor names,
/// contents); display text and chained causes are not part of a value's
/// identity.
#[derive(Debug, Error)]
pub enum Error {
    /// The URI is not registered and no retrieve hook could supply it.
    #[error("no resource registered at {uri}")]
    NoSuchResource { uri: String },

    /// The resource exists but declares no anchor with this name.
    #[error("the resource at {uri} declares no anchor named {anchor:?}")]
    NoSuchAnchor { uri: String, anchor: String },

    /// A JSON pointer stepped somewhere the resource's contents do not go.
    #[error("{}", pointer_message(.reference))]
    PointerToNowhere {
        reference: String,
        resource: Resource,
    },

    /// The fragment contains `/` without starting with it, so it is
    /// neither a pointer nor a plain-name anchor.
    #[error("{anchor:?} is not a valid anchor in {uri} (did you mean {suggestion:?}?)")]
    InvalidAnchor {
        uri: String,
        anchor: String,
        suggestion: String,
    },

    /// `$schema` was absent, not a string, or named an unknown dialect.
    #[error("unable to determine the specification for {contents}")]
    CannotDetermineSpecification { contents: Value },

    /// The resource was added via the id-based shorthand but has no id.
    #[error("the resource has no internal id to register it under")]
    NoInternalId { resource: Resource },

    /// The retrieve hook was invoked and failed.
    #[error("{uri} could not be retrieved")]
    Unretrievable {
        uri: String,
        #[source]
        source: BoxError,
    },

    /// Two differing resources were registered under the same URI.
    #[error("{uri} is already registered with different contents")]
    DuplicateResource { uri: String },
}

fn pointer_message(reference: &str) -> String {
    if reference == "/" {
        format!(
            "pointer {reference:?} leads nowhere: \"/\" addresses a property named \"\", \
             while the whole document is \"#\""
        )
    } else {
        format!("pointer {reference:?} leads nowhere in this resource")
    }
}

impl Error {
    pub(crate) fn invalid_anchor(uri: String, anchor: &str) -> Self {
        Error::InvalidAnchor {
            uri,
            anchor: anchor.to_string(),
            suggestion: format!("#/{anchor}"),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (NoSuchResource { uri: a }, NoSuchResource { uri: b }) => a == b,
            (NoSuchAnchor { uri: a, anchor: m }, NoSuchAnchor { uri: b, anchor: n }) => {
                a == b && m == n
            }
            (
                PointerToNowhere { reference: a, resource: r },
                PointerToNowhere { reference: b, resource: s },
            ) => a == b && r == s,
            (InvalidAnchor { uri: a, anchor: m, .. }, InvalidAnchor { uri: b, anchor: n, .. }) => {
                a == b && m == n
            }
            (
                CannotDetermineSpecification { contents: a },
                CannotDetermineSpecification { contents: b },
            ) => a == b,
            (NoInternalId { resource: r }, NoInternalId { resource: s }) => r == s,
            (Unretrievable { uri: a, .. }, Unretrievable { uri: b, .. }) => a == b,
            (DuplicateResource { uri: a }, DuplicateResource { uri: b }) => a == b,
            _ => false,
        }
    }
}
