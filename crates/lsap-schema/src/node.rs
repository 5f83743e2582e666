//! # Typed Schema Nodes
//!
//! Converts a dereferenced JSON Schema document into an explicit tree of
//! [`SchemaNode`]s. The emitter only ever matches on these variants, so every
//! construct it understands is visible here, and anything it cannot express
//! is rejected while converting rather than silently dropped.
//!
//! The templates side-channel (top-level `markdown`) is modelled as an
//! optional field of [`RootSchema`] instead of being probed for later.

use serde_json::{Map, Number, Value};

use crate::error::{CompileError, Result};

/// Top-level key carrying presentation templates for a schema.
pub const TEMPLATES_KEY: &str = "markdown";

const COMBINATORS: &[&str] = &["anyOf", "oneOf", "allOf"];

/// Keywords that never constrain an instance.
const ANNOTATIONS: &[&str] = &[
    "$id", "$schema", "$comment", "$defs", "definitions", "title", "description", "default",
    "examples", "deprecated", "readOnly", "writeOnly", TEMPLATES_KEY,
];

/// A whole schema document after dereferencing.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSchema {
    /// The validator tree.
    pub node: SchemaNode,
    /// Value of the templates side-channel, if present and not null.
    pub templates: Option<Value>,
}

/// One schema node with its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Structural kind and constraints.
    pub kind: SchemaKind,
    /// `description` annotation.
    pub description: Option<String>,
    /// `default` value, `Some(Value::Null)` for an explicit `null` default.
    pub default: Option<Value>,
}

/// The structural part of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// Accepts anything (`true`, `{}`).
    Any,
    /// Accepts nothing (`false`, empty `enum`).
    Never,
    Null,
    Boolean,
    String(StringSchema),
    Number(NumberSchema),
    Array(ArraySchema),
    Tuple(TupleSchema),
    Object(ObjectSchema),
    /// `enum` of primitive values.
    Enum(Vec<Value>),
    /// `const` primitive value.
    Const(Value),
    /// `anyOf`, `oneOf` or a multi-valued `type`.
    Union(Vec<SchemaNode>),
    /// `allOf`.
    Intersection(Vec<SchemaNode>),
}

/// Constraints of a `string` node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<StringFormat>,
}

/// String formats with a direct zod counterpart. Other formats are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Uri,
    Uuid,
    DateTime,
}

impl StringFormat {
    fn parse(format: &str) -> Option<Self> {
        match format {
            "email" => Some(Self::Email),
            "uri" | "url" => Some(Self::Uri),
            "uuid" => Some(Self::Uuid),
            "date-time" => Some(Self::DateTime),
            _ => None,
        }
    }
}

/// Constraints of a `number` or `integer` node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    /// `integer` rather than `number`.
    pub integer: bool,
    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
    pub multiple_of: Option<Number>,
}

/// A numeric bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Number,
    /// Excludes the bound value itself.
    pub exclusive: bool,
}

/// A homogeneous `array` node.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    /// Item schema; `None` accepts any item.
    pub items: Option<Box<SchemaNode>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
}

/// A positional `array` node (`prefixItems` or array-valued `items`).
#[derive(Debug, Clone, PartialEq)]
pub struct TupleSchema {
    pub prefix: Vec<SchemaNode>,
    /// Schema of items past the prefix; `None` when unconstrained.
    pub rest: Option<Box<SchemaNode>>,
}

/// An `object` node.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    /// Properties in source order.
    pub properties: Vec<Property>,
    pub additional: Additional,
}

/// A named object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: SchemaNode,
    /// Listed in the parent's `required`.
    pub required: bool,
}

/// `additionalProperties` policy of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    /// Keyword absent.
    Unspecified,
    /// `additionalProperties: true`.
    Allowed,
    /// `additionalProperties: false`.
    Forbidden,
    /// `additionalProperties: <schema>`.
    Schema(Box<SchemaNode>),
}

impl RootSchema {
    /// Convert the dereferenced document `value` keyed `document`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::Unsupported` for constructs the emitter cannot
    /// express, with a JSON Pointer to the offending node.
    pub fn from_value(document: &str, value: &Value) -> Result<Self> {
        let templates = value
            .get(TEMPLATES_KEY)
            .filter(|v| !v.is_null())
            .cloned();
        let node = Converter { document }.node(value, "")?;
        Ok(Self { node, templates })
    }
}

struct Converter<'a> {
    document: &'a str,
}

impl Converter<'_> {
    fn unsupported(&self, pointer: &str, reason: impl Into<String>) -> CompileError {
        CompileError::Unsupported {
            document: self.document.to_string(),
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }

    fn node(&self, value: &Value, pointer: &str) -> Result<SchemaNode> {
        let obj = match value {
            Value::Bool(true) => return Ok(plain(SchemaKind::Any)),
            Value::Bool(false) => return Ok(plain(SchemaKind::Never)),
            Value::Object(obj) if obj.contains_key("$ref") => {
                return Err(self.unsupported(pointer, "unresolved $ref"));
            }
            Value::Object(obj) => obj,
            other => {
                return Err(self.unsupported(
                    pointer,
                    format!("expected a schema object or boolean, found {other}"),
                ))
            }
        };

        let description = match obj.get("description") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(self.unsupported(pointer, "description must be a string")),
        };

        Ok(SchemaNode {
            kind: self.kind(obj, pointer)?,
            description,
            default: obj.get("default").cloned(),
        })
    }

    fn kind(&self, obj: &Map<String, Value>, pointer: &str) -> Result<SchemaKind> {
        if let Some(combined) = self.combinators(obj, pointer)? {
            let siblings: Map<String, Value> = obj
                .iter()
                .filter(|(key, _)| {
                    !COMBINATORS.contains(&key.as_str()) && !ANNOTATIONS.contains(&key.as_str())
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            if siblings.is_empty() {
                return Ok(combined);
            }
            return Ok(match self.kind(&siblings, pointer)? {
                SchemaKind::Any => combined,
                base => SchemaKind::Intersection(vec![plain(base), plain(combined)]),
            });
        }

        if let Some(value) = obj.get("const") {
            return self.primitive(value, &format!("{pointer}/const")).map(SchemaKind::Const);
        }

        if let Some(values) = obj.get("enum") {
            let Value::Array(values) = values else {
                return Err(self.unsupported(pointer, "enum must be an array"));
            };
            let values = values
                .iter()
                .enumerate()
                .map(|(i, v)| self.primitive(v, &format!("{pointer}/enum/{i}")))
                .collect::<Result<Vec<_>>>()?;
            return Ok(if values.is_empty() {
                SchemaKind::Never
            } else {
                SchemaKind::Enum(values)
            });
        }

        match obj.get("type") {
            Some(Value::String(ty)) => self.typed(ty, obj, pointer),
            Some(Value::Array(types)) => {
                let mut members = Vec::with_capacity(types.len());
                for (i, ty) in types.iter().enumerate() {
                    let Value::String(ty) = ty else {
                        return Err(self.unsupported(&format!("{pointer}/type/{i}"), "type names must be strings"));
                    };
                    members.push(plain(self.typed(ty, obj, pointer)?));
                }
                Ok(SchemaKind::Union(members))
            }
            Some(_) => Err(self.unsupported(pointer, "type must be a string or an array of strings")),
            None if ["properties", "additionalProperties", "required"]
                .iter()
                .any(|key| obj.contains_key(*key)) =>
            {
                self.typed("object", obj, pointer)
            }
            None if obj.contains_key("items") || obj.contains_key("prefixItems") => {
                self.typed("array", obj, pointer)
            }
            None => Ok(SchemaKind::Any),
        }
    }

    /// `anyOf`/`oneOf` as unions and `allOf` as an intersection, combined
    /// when several appear together. `None` if the object has none.
    fn combinators(&self, obj: &Map<String, Value>, pointer: &str) -> Result<Option<SchemaKind>> {
        let mut parts = Vec::new();
        for keyword in ["anyOf", "oneOf"] {
            if let Some(members) = obj.get(keyword) {
                parts.push(SchemaKind::Union(self.members(members, &format!("{pointer}/{keyword}"))?));
            }
        }
        if let Some(members) = obj.get("allOf") {
            let mut members = self.members(members, &format!("{pointer}/allOf"))?;
            parts.push(match members.len() {
                1 => members.remove(0).kind,
                _ => SchemaKind::Intersection(members),
            });
        }
        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(SchemaKind::Intersection(parts.into_iter().map(plain).collect())),
        })
    }

    fn typed(&self, ty: &str, obj: &Map<String, Value>, pointer: &str) -> Result<SchemaKind> {
        match ty {
            "null" => Ok(SchemaKind::Null),
            "boolean" => Ok(SchemaKind::Boolean),
            "string" => Ok(SchemaKind::String(StringSchema {
                min_length: self.count(obj, "minLength", pointer)?,
                max_length: self.count(obj, "maxLength", pointer)?,
                pattern: obj.get("pattern").and_then(Value::as_str).map(str::to_string),
                format: obj.get("format").and_then(Value::as_str).and_then(StringFormat::parse),
            })),
            "integer" | "number" => Ok(SchemaKind::Number(NumberSchema {
                integer: ty == "integer",
                minimum: self.bound(obj, "minimum", "exclusiveMinimum", pointer)?,
                maximum: self.bound(obj, "maximum", "exclusiveMaximum", pointer)?,
                multiple_of: self.number(obj, "multipleOf", pointer)?,
            })),
            "array" => self.array(obj, pointer),
            "object" => self.object(obj, pointer),
            other => Err(self.unsupported(pointer, format!("unknown type '{other}'"))),
        }
    }

    fn array(&self, obj: &Map<String, Value>, pointer: &str) -> Result<SchemaKind> {
        let (prefix, rest_key) = match (obj.get("prefixItems"), obj.get("items")) {
            (Some(prefix), _) => (Some((prefix, "prefixItems")), "items"),
            (None, Some(items @ Value::Array(_))) => (Some((items, "items")), "additionalItems"),
            _ => (None, "items"),
        };

        if let Some((prefix, key)) = prefix {
            let prefix = self.members(prefix, &format!("{pointer}/{key}"))?;
            let rest = match obj.get(rest_key) {
                None | Some(Value::Bool(true)) => None,
                Some(schema) => Some(Box::new(self.node(schema, &format!("{pointer}/{rest_key}"))?)),
            };
            return Ok(SchemaKind::Tuple(TupleSchema { prefix, rest }));
        }

        let items = match obj.get("items") {
            None => None,
            Some(schema) => Some(Box::new(self.node(schema, &format!("{pointer}/items"))?)),
        };
        Ok(SchemaKind::Array(ArraySchema {
            items,
            min_items: self.count(obj, "minItems", pointer)?,
            max_items: self.count(obj, "maxItems", pointer)?,
        }))
    }

    fn object(&self, obj: &Map<String, Value>, pointer: &str) -> Result<SchemaKind> {
        let required: Vec<&str> = match obj.get("required") {
            None => Vec::new(),
            Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
            Some(_) => return Err(self.unsupported(pointer, "required must be an array")),
        };

        let properties = match obj.get("properties") {
            None => Vec::new(),
            Some(Value::Object(props)) => props
                .iter()
                .map(|(name, schema)| {
                    let child = format!("{pointer}/properties/{}", escape_pointer(name));
                    Ok(Property {
                        name: name.clone(),
                        schema: self.node(schema, &child)?,
                        required: required.contains(&name.as_str()),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(self.unsupported(pointer, "properties must be an object")),
        };

        if let Some(name) = required
            .iter()
            .find(|name| !properties.iter().any(|p| p.name == **name))
        {
            return Err(self.unsupported(
                pointer,
                format!("required property '{name}' is not declared in properties"),
            ));
        }

        let additional = match obj.get("additionalProperties") {
            None => Additional::Unspecified,
            Some(Value::Bool(true)) => Additional::Allowed,
            Some(Value::Bool(false)) => Additional::Forbidden,
            Some(schema) => Additional::Schema(Box::new(
                self.node(schema, &format!("{pointer}/additionalProperties"))?,
            )),
        };

        Ok(SchemaKind::Object(ObjectSchema { properties, additional }))
    }

    fn members(&self, value: &Value, pointer: &str) -> Result<Vec<SchemaNode>> {
        let Value::Array(members) = value else {
            return Err(self.unsupported(pointer, "expected an array of schemas"));
        };
        members
            .iter()
            .enumerate()
            .map(|(i, member)| self.node(member, &format!("{pointer}/{i}")))
            .collect()
    }

    fn primitive(&self, value: &Value, pointer: &str) -> Result<Value> {
        match value {
            Value::Array(_) | Value::Object(_) => {
                Err(self.unsupported(pointer, "only primitive literal values are supported"))
            }
            primitive => Ok(primitive.clone()),
        }
    }

    fn count(&self, obj: &Map<String, Value>, key: &str, pointer: &str) -> Result<Option<u64>> {
        match obj.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
                .map(Some)
                .ok_or_else(|| self.unsupported(pointer, format!("{key} must be a non-negative integer"))),
        }
    }

    fn number(&self, obj: &Map<String, Value>, key: &str, pointer: &str) -> Result<Option<Number>> {
        match obj.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n.clone())),
            Some(_) => Err(self.unsupported(pointer, format!("{key} must be a number"))),
        }
    }

    /// Read an inclusive bound and its exclusive counterpart. Both the
    /// numeric form (draft 6+) and the legacy boolean form are accepted; the
    /// tighter numeric bound wins when both are present.
    fn bound(
        &self,
        obj: &Map<String, Value>,
        inclusive_key: &str,
        exclusive_key: &str,
        pointer: &str,
    ) -> Result<Option<Bound>> {
        let inclusive = self.number(obj, inclusive_key, pointer)?;
        match obj.get(exclusive_key) {
            None | Some(Value::Bool(false)) => Ok(inclusive.map(|value| Bound { value, exclusive: false })),
            Some(Value::Bool(true)) => Ok(inclusive.map(|value| Bound { value, exclusive: true })),
            Some(Value::Number(exclusive)) => {
                let exclusive = Bound { value: exclusive.clone(), exclusive: true };
                let Some(inclusive) = inclusive else {
                    return Ok(Some(exclusive));
                };
                let (a, b) = (exclusive.value.as_f64(), inclusive.as_f64());
                let exclusive_is_tighter = match (a, b) {
                    (Some(a), Some(b)) if inclusive_key == "minimum" => a >= b,
                    (Some(a), Some(b)) => a <= b,
                    _ => true,
                };
                Ok(Some(if exclusive_is_tighter {
                    exclusive
                } else {
                    Bound { value: inclusive, exclusive: false }
                }))
            }
            Some(_) => Err(self.unsupported(pointer, format!("{exclusive_key} must be a number or boolean"))),
        }
    }
}

fn plain(kind: SchemaKind) -> SchemaNode {
    SchemaNode {
        kind,
        description: None,
        default: None,
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn convert(value: Value) -> SchemaNode {
        RootSchema::from_value("Test.json", &value).unwrap().node
    }

    #[test]
    fn boolean_schemas() {
        assert_eq!(convert(json!(true)).kind, SchemaKind::Any);
        assert_eq!(convert(json!(false)).kind, SchemaKind::Never);
        assert_eq!(convert(json!({})).kind, SchemaKind::Any);
    }

    #[test]
    fn type_array_becomes_union_with_shared_constraints() {
        let node = convert(json!({"type": ["integer", "null"], "minimum": 1, "default": null}));
        assert_eq!(node.default, Some(Value::Null));
        let SchemaKind::Union(members) = node.kind else {
            panic!("expected union");
        };
        assert_eq!(members.len(), 2);
        match &members[0].kind {
            SchemaKind::Number(n) => {
                assert!(n.integer);
                assert_eq!(n.minimum, Some(Bound { value: 1.into(), exclusive: false }));
            }
            other => panic!("expected number, got {other:?}"),
        }
        assert_eq!(members[1].kind, SchemaKind::Null);
    }

    #[test]
    fn object_properties_keep_source_order_and_required_flags() {
        let node = convert(json!({
            "type": "object",
            "properties": {"zeta": {"type": "string"}, "alpha": {"type": "boolean"}},
            "required": ["zeta"],
            "additionalProperties": false
        }));
        let SchemaKind::Object(obj) = node.kind else {
            panic!("expected object");
        };
        let names: Vec<_> = obj.properties.iter().map(|p| (p.name.as_str(), p.required)).collect();
        assert_eq!(names, [("zeta", true), ("alpha", false)]);
        assert_eq!(obj.additional, Additional::Forbidden);
    }

    #[test]
    fn missing_type_is_inferred() {
        assert!(matches!(convert(json!({"properties": {}})).kind, SchemaKind::Object(_)));
        assert!(matches!(convert(json!({"items": {"type": "string"}})).kind, SchemaKind::Array(_)));
    }

    #[test]
    fn prefix_items_become_tuple() {
        let node = convert(json!({
            "type": "array",
            "prefixItems": [{"type": "integer"}, {"type": "integer"}],
            "minItems": 2,
            "maxItems": 2
        }));
        let SchemaKind::Tuple(tuple) = node.kind else {
            panic!("expected tuple");
        };
        assert_eq!(tuple.prefix.len(), 2);
        assert!(tuple.rest.is_none());
    }

    #[test]
    fn legacy_tuple_items_with_additional_items() {
        let node = convert(json!({
            "items": [{"type": "string"}],
            "additionalItems": {"type": "number"}
        }));
        let SchemaKind::Tuple(tuple) = node.kind else {
            panic!("expected tuple");
        };
        assert!(matches!(tuple.rest.as_deref().map(|n| &n.kind), Some(SchemaKind::Number(_))));
    }

    #[test]
    fn exclusive_bounds_both_forms() {
        let SchemaKind::Number(n) = convert(json!({"type": "number", "exclusiveMinimum": 0})).kind else {
            panic!("expected number");
        };
        assert_eq!(n.minimum, Some(Bound { value: 0.into(), exclusive: true }));

        let SchemaKind::Number(n) =
            convert(json!({"type": "number", "maximum": 10, "exclusiveMaximum": true})).kind
        else {
            panic!("expected number");
        };
        assert_eq!(n.maximum, Some(Bound { value: 10.into(), exclusive: true }));
    }

    #[test]
    fn empty_enum_is_never() {
        assert_eq!(convert(json!({"enum": []})).kind, SchemaKind::Never);
    }

    #[test]
    fn single_all_of_collapses() {
        let node = convert(json!({"allOf": [{"type": "string"}], "description": "wrapped"}));
        assert!(matches!(node.kind, SchemaKind::String(_)));
        assert_eq!(node.description.as_deref(), Some("wrapped"));
    }

    #[test]
    fn templates_side_channel_is_extracted() {
        let root = RootSchema::from_value(
            "SymbolResponse.json",
            &json!({"type": "object", "markdown": "### {{ name }}"}),
        )
        .unwrap();
        assert_eq!(root.templates, Some(json!("### {{ name }}")));

        let root = RootSchema::from_value("X.json", &json!({"markdown": null})).unwrap();
        assert_eq!(root.templates, None);
    }

    #[test]
    fn nested_lsap_templates_key_is_not_a_side_channel() {
        let root = RootSchema::from_value(
            "X.json",
            &json!({"type": "object", "lsap_templates": {"markdown": "x"}}),
        )
        .unwrap();
        assert_eq!(root.templates, None);
    }

    #[test]
    fn object_enum_values_are_unsupported_with_pointer() {
        let err = RootSchema::from_value(
            "Bad.json",
            &json!({"properties": {"a/b": {"enum": [{"x": 1}]}}}),
        )
        .unwrap_err();
        match err {
            CompileError::Unsupported { document, pointer, .. } => {
                assert_eq!(document, "Bad.json");
                assert_eq!(pointer, "/properties/a~1b/enum/0");
            }
            other => panic!("expected Unsupported, got: {other}"),
        }
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let err = RootSchema::from_value("Bad.json", &json!({"type": "decimal"})).unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }), "got {err}");
    }

    #[test]
    fn leftover_ref_is_unsupported() {
        let err = RootSchema::from_value(
            "Doc.json",
            &json!({"properties": {"default": {"$ref": "Position.json"}}}),
        )
        .unwrap_err();
        match err {
            CompileError::Unsupported { pointer, reason, .. } => {
                assert_eq!(pointer, "/properties/default");
                assert!(reason.contains("$ref"), "{reason}");
            }
            other => panic!("expected Unsupported, got: {other}"),
        }
    }

    #[test]
    fn combinator_with_object_siblings_becomes_intersection() {
        let node = convert(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a"],
            "anyOf": [
                {"properties": {"b": {"type": "integer"}}, "required": ["b"]},
                {"properties": {"c": {"type": "integer"}}, "required": ["c"]}
            ]
        }));
        let SchemaKind::Intersection(parts) = node.kind else {
            panic!("expected intersection");
        };
        let SchemaKind::Object(base) = &parts[0].kind else {
            panic!("expected object base, got {:?}", parts[0].kind);
        };
        assert_eq!(base.properties.len(), 1);
        assert!(base.properties[0].required);
        assert!(matches!(&parts[1].kind, SchemaKind::Union(members) if members.len() == 2));
    }

    #[test]
    fn annotation_and_unknown_siblings_keep_plain_union() {
        let node = convert(json!({
            "anyOf": [{"type": "integer"}, {"type": "null"}],
            "title": "Max Items",
            "default": null,
            "discriminator": "kind"
        }));
        assert!(matches!(node.kind, SchemaKind::Union(_)));
    }

    #[test]
    fn required_without_declared_property_is_unsupported() {
        let err = RootSchema::from_value(
            "Doc.json",
            &json!({"type": "object", "properties": {"a": {"type": "string"}}, "anyOf": [{"required": ["b"]}]}),
        )
        .unwrap_err();
        match err {
            CompileError::Unsupported { pointer, .. } => assert_eq!(pointer, "/anyOf/0"),
            other => panic!("expected Unsupported, got: {other}"),
        }
    }

    #[test]
    fn several_combinators_intersect() {
        let node = convert(json!({
            "anyOf": [{"type": "string"}, {"type": "null"}],
            "allOf": [{"type": "string"}]
        }));
        let SchemaKind::Intersection(parts) = node.kind else {
            panic!("expected intersection");
        };
        assert!(matches!(parts[0].kind, SchemaKind::Union(_)));
        assert!(matches!(parts[1].kind, SchemaKind::String(_)));
    }
}
