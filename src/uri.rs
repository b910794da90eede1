//! URI joining, normalization, and fragment classification.
//!
//! Registry keys and resolver bases are plain strings; this module is the
//! one place that knows RFC 3986. Absolute URIs go through [`url::Url`]
//! for parsing and reference resolution. Relative and empty references,
//! which `url::Url` cannot represent, are handled at the string layer:
//! joining anything against an empty or unparseable base yields the
//! reference itself, which is how anonymous (empty-URI) resources keep
//! working.

use url::Url;

/// What the fragment of a reference turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FragmentKind {
    /// No `#` at all.
    None,
    /// A bare trailing `#`.
    Empty,
    /// An RFC 6901 JSON pointer (`#/...`).
    Pointer,
    /// A plain-name anchor (non-empty, no `/`).
    Anchor,
    /// Contains `/` without starting with it; neither pointer nor anchor.
    Invalid,
}

pub(crate) fn fragment_kind(fragment: Option<&str>) -> FragmentKind {
    match fragment {
        None => FragmentKind::None,
        Some("") => FragmentKind::Empty,
        Some(fragment) if fragment.starts_with('/') => FragmentKind::Pointer,
        Some(fragment) if !fragment.contains('/') => FragmentKind::Anchor,
        Some(_) => FragmentKind::Invalid,
    }
}

/// Split a reference at its first `#`.
///
/// `Some("")` (a bare trailing `#`) is distinct from `None` (no `#`),
/// matching how empty fragments are significant at parse time only.
pub(crate) fn defrag(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('#') {
        Some((absolute, fragment)) => (absolute, Some(fragment)),
        None => (uri, None),
    }
}

/// Strip a trailing empty fragment: `http://x#` and `http://x` are the
/// same registry key.
pub(crate) fn strip_empty_fragment(uri: &str) -> &str {
    uri.strip_suffix('#').unwrap_or(uri)
}

/// Normalize a URI for use as a registry key.
///
/// Absolute URIs get full RFC 3986 normalization (lowercased scheme and
/// authority, canonical percent-encoding); anything else is kept verbatim
/// so relative and empty keys round-trip.
pub(crate) fn normalize(uri: &str) -> String {
    let uri = strip_empty_fragment(uri);
    match Url::parse(uri) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => uri.to_string(),
    }
}

/// RFC 3986 reference resolution of `reference` against `base`,
/// reporting bases that cannot absorb a relative reference.
///
/// `None` means the reference is relative and the base gives it nothing
/// to resolve against: an empty or unparseable base, or an opaque
/// (cannot-be-a-base) one such as `urn:ex:a`. Callers holding a second,
/// hierarchical URI can retry the join against that instead.
pub(crate) fn try_join(base: &str, reference: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(reference) {
        return Some(absolute.to_string());
    }
    Url::parse(base)
        .ok()
        .and_then(|parsed| parsed.join(reference).ok())
        .map(|joined| joined.to_string())
}

/// RFC 3986 reference resolution of `reference` against `base`, keeping
/// the reference verbatim when the base cannot absorb it.
pub(crate) fn join(base: &str, reference: &str) -> String {
    try_join(base, reference).unwrap_or_else(|| reference.to_string())
}
