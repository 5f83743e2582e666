//! # Reference Resolution
//!
//! Replaces every `$ref` of a schema document with a structural copy of the
//! subtree it points to, producing a document with no residual references.
//!
//! ## Supported references
//!
//! - `#/json/pointer` (and `#`) inside the referencing document.
//! - Relative file references such as `Position.json`, `./Position.json` or
//!   `../locate/Position.json#/$defs/Range`, resolved against the directory
//!   of the referencing document.
//! - Absolute URIs matching a document's declared `$id`.
//!
//! Remote URLs, plain-name anchors and paths escaping the source root are
//! rejected. A reference that re-enters a target still being expanded is a
//! cycle, since the inlined result would be infinite.
//!
//! Values of data keywords (`const`, `default`, `enum`, `examples` and the
//! templates side-channel) are copied verbatim: they are instance data, not
//! subschemas.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use crate::error::ReferenceError;
use crate::node::TEMPLATES_KEY;
use crate::registry::{is_absolute_uri, SchemaRegistry};

/// Keywords whose values are data rather than schemas.
const DATA_KEYWORDS: &[&str] = &["const", "default", "enum", "examples", TEMPLATES_KEY];

/// Keywords whose values map arbitrary names to subschemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
];

/// The subtree a reference resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Key of the document containing the target.
    pub document: String,
    /// JSON Pointer of the target inside that document (empty for the root).
    pub pointer: String,
    /// Copy of the target subtree, references not yet expanded.
    pub value: Value,
}

impl Target {
    fn id(&self) -> String {
        format!("{}#{}", self.document, self.pointer)
    }
}

/// Resolves a single `$ref` string found in a document.
///
/// The schema registry is the production implementation; tests substitute
/// in-memory resolvers.
pub trait ResolveRef {
    /// Resolve `reference`, which appears in the document keyed `document`.
    fn resolve(&self, document: &str, reference: &str) -> Result<Target, ReferenceError>;
}

impl ResolveRef for SchemaRegistry {
    fn resolve(&self, document: &str, reference: &str) -> Result<Target, ReferenceError> {
        let unsupported = |reason| ReferenceError::Unsupported {
            document: document.to_string(),
            reference: reference.to_string(),
            reason,
        };

        let (location, fragment) = match reference.split_once('#') {
            Some((location, fragment)) => (location, fragment),
            None => (reference, ""),
        };

        let target_key = if location.is_empty() {
            document.to_string()
        } else if is_absolute_uri(location) {
            self.key_for_id(location)
                .ok_or_else(|| unsupported("remote references are not resolved"))?
                .to_string()
        } else if location.starts_with('/') {
            return Err(unsupported("absolute paths are not supported"));
        } else {
            join_relative(document, location)
                .ok_or_else(|| unsupported("path escapes the schema root"))?
        };

        let root = self
            .get(&target_key)
            .ok_or_else(|| ReferenceError::MissingDocument {
                document: document.to_string(),
                reference: reference.to_string(),
                target: target_key.clone(),
            })?;

        let pointer = percent_decode(fragment);
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(unsupported("plain-name fragments are not supported"));
        }
        let value = root
            .pointer(&pointer)
            .ok_or_else(|| ReferenceError::MissingPointer {
                document: document.to_string(),
                reference: reference.to_string(),
                pointer: pointer.clone(),
            })?
            .clone();

        Ok(Target {
            document: target_key,
            pointer,
            value,
        })
    }
}

/// Return `value` (the root of document `document`) with every `$ref` inlined.
///
/// # Errors
///
/// Returns the first `ReferenceError` encountered: a dangling target, an
/// unsupported reference form, or a cycle.
pub fn dereference(
    document: &str,
    value: &Value,
    resolver: &impl ResolveRef,
) -> Result<Value, ReferenceError> {
    let mut stack = vec![format!("{document}#")];
    expand(document, value, resolver, &mut stack)
}

fn expand(
    document: &str,
    value: &Value,
    resolver: &impl ResolveRef,
    stack: &mut Vec<String>,
) -> Result<Value, ReferenceError> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                return expand_reference(document, reference, map, resolver, stack);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key.clone(), expand_keyword(document, key, child, resolver, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| expand(document, item, resolver, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Expand the value of keyword `key` of a schema object. Names inside
/// schema maps are never keywords, so each entry is expanded as a schema.
fn expand_keyword(
    document: &str,
    key: &str,
    value: &Value,
    resolver: &impl ResolveRef,
    stack: &mut Vec<String>,
) -> Result<Value, ReferenceError> {
    if DATA_KEYWORDS.contains(&key) {
        return Ok(value.clone());
    }
    match value {
        Value::Object(entries) if SCHEMA_MAP_KEYWORDS.contains(&key) => {
            let mut out = Map::with_capacity(entries.len());
            for (name, schema) in entries {
                out.insert(name.clone(), expand(document, schema, resolver, stack)?);
            }
            Ok(Value::Object(out))
        }
        other => expand(document, other, resolver, stack),
    }
}

/// Inline one `$ref` object. Sibling keywords are merged over the resolved
/// target and win on conflict.
fn expand_reference(
    document: &str,
    reference: &str,
    map: &Map<String, Value>,
    resolver: &impl ResolveRef,
    stack: &mut Vec<String>,
) -> Result<Value, ReferenceError> {
    let target = resolver.resolve(document, reference)?;
    let id = target.id();
    if stack.contains(&id) {
        let mut chain = stack.clone();
        chain.push(id);
        return Err(ReferenceError::Cycle {
            document: document.to_string(),
            chain,
        });
    }

    tracing::trace!(%document, %reference, target = %id, "inlining reference");
    stack.push(id);
    let resolved = expand(&target.document, &target.value, resolver, stack);
    stack.pop();
    let mut resolved = resolved?;

    let siblings: Vec<_> = map.iter().filter(|(key, _)| *key != "$ref").collect();
    if siblings.is_empty() {
        return Ok(resolved);
    }
    if resolved == Value::Bool(true) {
        resolved = Value::Object(Map::new());
    }
    if let Value::Object(obj) = &mut resolved {
        for (key, child) in siblings {
            let child = expand_keyword(document, key, child, resolver, stack)?;
            obj.insert(key.clone(), child);
        }
    }
    Ok(resolved)
}

/// Resolve `relative` against the directory of document `base`, normalizing
/// `.` and `..` segments. Returns `None` if the result leaves the root.
fn join_relative(base: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = base.split('/').collect();
    parts.pop();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Decode `%XX` escapes in a URI fragment. Invalid escapes are kept as-is.
fn percent_decode(fragment: &str) -> String {
    percent_decode_str(fragment)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| fragment.to_string())
}
