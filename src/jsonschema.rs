//! Referencing support for JSON Schema dialects, historic and current.
//!
//! Each draft is a [`Specification`] constant describing how that dialect
//! declares identifiers (`id` / `$id`), anchors (`$anchor`,
//! `$dynamicAnchor`, legacy `#name` ids), and which keywords carry
//! subschemas. [`specification_with`] maps a `$schema` value onto the
//! table.

use serde_json::{Map, Value};

use crate::error::Error;
use crate::resolver::{Resolved, Resolver};
use crate::specification::Specification;

/// JSON Schema draft 2020-12.
pub const DRAFT202012: Specification = Specification::new(
    "draft2020-12",
    "https://json-schema.org/draft/2020-12/schema",
    dollar_id,
    anchors_draft2020,
    subresources_draft2020,
);

/// JSON Schema draft 2019-09.
pub const DRAFT201909: Specification = Specification::new(
    "draft2019-09",
    "https://json-schema.org/draft/2019-09/schema",
    dollar_id,
    anchors_draft2019,
    subresources_draft2019,
);

/// JSON Schema draft 7.
pub const DRAFT7: Specification = Specification::new(
    "draft-07",
    "http://json-schema.org/draft-07/schema#",
    legacy_dollar_id,
    anchor_in_dollar_id,
    subresources_draft7,
);

/// JSON Schema draft 6.
pub const DRAFT6: Specification = Specification::new(
    "draft-06",
    "http://json-schema.org/draft-06/schema#",
    legacy_dollar_id,
    anchor_in_dollar_id,
    subresources_draft6,
);

/// JSON Schema draft 4.
pub const DRAFT4: Specification = Specification::new(
    "draft-04",
    "http://json-schema.org/draft-04/schema#",
    legacy_id,
    anchor_in_id,
    subresources_draft4,
);

const KNOWN_DIALECTS: [Specification; 5] = [DRAFT202012, DRAFT201909, DRAFT7, DRAFT6, DRAFT4];

/// Retrieve the [`Specification`] with the given meta-schema URI.
///
/// A trailing `#` is accepted with or without, on either side.
///
/// # Errors
///
/// Returns [`Error::CannotDetermineSpecification`] for unknown dialects.
pub fn specification_with(dialect_id: &str) -> Result<Specification, Error> {
    let wanted = dialect_id.strip_suffix('#').unwrap_or(dialect_id);
    KNOWN_DIALECTS
        .iter()
        .find(|specification| {
            let id = specification.dialect_id().unwrap_or("");
            id.strip_suffix('#').unwrap_or(id) == wanted
        })
        .copied()
        .ok_or_else(|| Error::CannotDetermineSpecification {
            contents: Value::String(dialect_id.to_string()),
        })
}

/// Resolve a draft 2019-09 `$recursiveRef`.
///
/// Resolves `#`; when the target carries `$recursiveAnchor: true`, the
/// result is re-targeted to the outermost dynamic-scope frame that also
/// carries it.
///
/// # Errors
///
/// Whatever the underlying lookups return.
pub fn lookup_recursive_ref(resolver: &Resolver) -> Result<Resolved, Error> {
    let resolved = resolver.lookup("#")?;
    if !recursive_anchor(resolved.contents()) {
        return Ok(resolved);
    }
    for (uri, resource) in resolver.dynamic_scope() {
        if recursive_anchor(resource.contents()) {
            return resolver.lookup(&uri);
        }
    }
    Ok(resolved)
}

fn recursive_anchor(contents: &Value) -> bool {
    contents
        .get("$recursiveAnchor")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

// --- Identifiers ---

/// `$id` on 2019-09/2020-12: empty (after stripping a bare trailing `#`)
/// means no id.
fn dollar_id(contents: &Value) -> Option<&str> {
    let id = contents.get("$id")?.as_str()?;
    let id = id.strip_suffix('#').unwrap_or(id);
    (!id.is_empty()).then_some(id)
}

/// `$id` on drafts 6/7: suppressed next to `$ref`, and `#name` forms are
/// anchors rather than ids.
fn legacy_dollar_id(contents: &Value) -> Option<&str> {
    legacy_keyword_id(contents, "$id")
}

/// `id` on draft 4, with the same suppression rules as drafts 6/7.
fn legacy_id(contents: &Value) -> Option<&str> {
    legacy_keyword_id(contents, "id")
}

fn legacy_keyword_id<'v>(contents: &'v Value, keyword: &str) -> Option<&'v str> {
    let object = contents.as_object()?;
    if object.contains_key("$ref") {
        return None;
    }
    let id = object.get(keyword)?.as_str()?;
    if id.starts_with('#') {
        return None;
    }
    let id = id.strip_suffix('#').unwrap_or(id);
    (!id.is_empty()).then_some(id)
}

// --- Anchors ---

fn anchors_draft2020(contents: &Value) -> Vec<(String, bool)> {
    let mut anchors = anchors_draft2019(contents);
    if let Some(name) = contents.get("$dynamicAnchor").and_then(Value::as_str) {
        anchors.push((name.to_string(), true));
    }
    anchors
}

fn anchors_draft2019(contents: &Value) -> Vec<(String, bool)> {
    match contents.get("$anchor").and_then(Value::as_str) {
        Some(name) => vec![(name.to_string(), false)],
        None => Vec::new(),
    }
}

fn anchor_in_dollar_id(contents: &Value) -> Vec<(String, bool)> {
    anchor_in_keyword(contents, "$id")
}

fn anchor_in_id(contents: &Value) -> Vec<(String, bool)> {
    anchor_in_keyword(contents, "id")
}

/// Pre-2019 drafts spell anchors as ids of the form `#name`.
fn anchor_in_keyword(contents: &Value, keyword: &str) -> Vec<(String, bool)> {
    match contents.get(keyword).and_then(Value::as_str) {
        Some(id) if id.starts_with('#') => vec![(id[1..].to_string(), false)],
        _ => Vec::new(),
    }
}

// --- Subresources ---

fn subresources_draft2020<'v>(contents: &'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    keyword_subresources(
        contents,
        &[
            "additionalProperties",
            "contains",
            "contentSchema",
            "else",
            "if",
            "items",
            "not",
            "propertyNames",
            "then",
            "unevaluatedItems",
            "unevaluatedProperties",
        ],
        &[
            "$defs",
            "definitions",
            "dependentSchemas",
            "patternProperties",
            "properties",
        ],
        &["allOf", "anyOf", "oneOf", "prefixItems"],
    )
}

fn subresources_draft2019<'v>(contents: &'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    let Some(object) = contents.as_object() else {
        return Box::new(std::iter::empty());
    };
    let rest = keyword_subresources(
        contents,
        &[
            "additionalItems",
            "additionalProperties",
            "contains",
            "contentSchema",
            "else",
            "if",
            "not",
            "propertyNames",
            "then",
            "unevaluatedItems",
            "unevaluatedProperties",
        ],
        &[
            "$defs",
            "definitions",
            "dependentSchemas",
            "patternProperties",
            "properties",
        ],
        &["allOf", "anyOf", "oneOf"],
    );
    Box::new(items_schema_or_array(object).chain(rest))
}

fn subresources_draft7<'v>(contents: &'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    let Some(object) = contents.as_object() else {
        return Box::new(std::iter::empty());
    };
    let rest = keyword_subresources(
        contents,
        &[
            "additionalItems",
            "additionalProperties",
            "contains",
            "else",
            "if",
            "not",
            "propertyNames",
            "then",
        ],
        &["definitions", "patternProperties", "properties"],
        &["allOf", "anyOf", "oneOf"],
    );
    Box::new(items_schema_or_array(object).chain(rest))
}

fn subresources_draft6<'v>(contents: &'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    let Some(object) = contents.as_object() else {
        return Box::new(std::iter::empty());
    };
    let rest = keyword_subresources(
        contents,
        &[
            "additionalItems",
            "additionalProperties",
            "contains",
            "not",
            "propertyNames",
        ],
        &["definitions", "patternProperties", "properties"],
        &["allOf", "anyOf", "oneOf"],
    );
    Box::new(items_schema_or_array(object).chain(rest))
}

/// Draft 4 `additionalItems`/`additionalProperties` may be booleans,
/// which are not schemas there.
const DRAFT4_OBJECT_ONLY: &[&str] = &["additionalItems", "additionalProperties"];

fn subresources_draft4<'v>(contents: &'v Value) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    let Some(object) = contents.as_object() else {
        return Box::new(std::iter::empty());
    };
    let additional = DRAFT4_OBJECT_ONLY
        .iter()
        .filter_map(|keyword| object.get(*keyword))
        .filter(|value| value.is_object());
    let rest = keyword_subresources(
        contents,
        &["not"],
        &["definitions", "patternProperties", "properties"],
        &["allOf", "anyOf", "oneOf"],
    );
    Box::new(items_schema_or_array(object).chain(additional).chain(rest))
}

/// Pre-2020 `items` is either a single schema or an array of schemas.
fn items_schema_or_array<'v>(
    object: &'v Map<String, Value>,
) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    match object.get("items") {
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(single) => Box::new(std::iter::once(single)),
        None => Box::new(std::iter::empty()),
    }
}

/// The common shape of a dialect's subresource walk: keywords whose value
/// is a schema, keywords whose object values are schemas, and keywords
/// whose array elements are schemas.
fn keyword_subresources<'v>(
    contents: &'v Value,
    in_value: &'static [&'static str],
    in_subvalues: &'static [&'static str],
    in_subarray: &'static [&'static str],
) -> Box<dyn Iterator<Item = &'v Value> + 'v> {
    let Some(object) = contents.as_object() else {
        return Box::new(std::iter::empty());
    };
    let values = in_value.iter().filter_map(|keyword| object.get(*keyword));
    let subvalues = in_subvalues
        .iter()
        .filter_map(|keyword| object.get(*keyword))
        .filter_map(Value::as_object)
        .flat_map(Map::values);
    let subarrays = in_subarray
        .iter()
        .filter_map(|keyword| object.get(*keyword))
        .filter_map(Value::as_array)
        .flatten();
    Box::new(values.chain(subvalues).chain(subarrays))
}
