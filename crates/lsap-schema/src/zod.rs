//! # Zod Emission
//!
//! Renders a [`SchemaNode`] tree as a single-line `zod` expression. Output is
//! a pure function of the node, so identical schemas always produce
//! byte-identical expressions.

use std::fmt::Write as _;

use serde_json::{Number, Value};

use crate::node::{
    Additional, ArraySchema, Bound, NumberSchema, ObjectSchema, SchemaKind, SchemaNode,
    StringFormat, StringSchema, TupleSchema,
};

/// Render `node` as a zod expression.
pub fn expression(node: &SchemaNode) -> String {
    let mut out = base(&node.kind);
    if let Some(description) = &node.description {
        let _ = write!(out, ".describe({})", js_literal(&Value::String(description.clone())));
    }
    if let Some(default) = &node.default {
        let _ = write!(out, ".default({})", js_literal(default));
    }
    out
}

fn base(kind: &SchemaKind) -> String {
    match kind {
        SchemaKind::Any => "z.any()".to_string(),
        SchemaKind::Never => "z.never()".to_string(),
        SchemaKind::Null => "z.null()".to_string(),
        SchemaKind::Boolean => "z.boolean()".to_string(),
        SchemaKind::String(s) => string(s),
        SchemaKind::Number(n) => number(n),
        SchemaKind::Array(a) => array(a),
        SchemaKind::Tuple(t) => tuple(t),
        SchemaKind::Object(o) => object(o),
        SchemaKind::Enum(values) => enumeration(values),
        SchemaKind::Const(value) => format!("z.literal({})", js_literal(value)),
        SchemaKind::Union(members) => union(members.iter().map(expression).collect()),
        SchemaKind::Intersection(members) => {
            let mut members = members.iter().map(expression);
            let first = members.next().unwrap_or_else(|| "z.any()".to_string());
            members.fold(first, |acc, next| format!("z.intersection({acc}, {next})"))
        }
    }
}

fn string(s: &StringSchema) -> String {
    let mut out = String::from("z.string()");
    match s.format {
        Some(StringFormat::Email) => out.push_str(".email()"),
        Some(StringFormat::Uri) => out.push_str(".url()"),
        Some(StringFormat::Uuid) => out.push_str(".uuid()"),
        Some(StringFormat::DateTime) => out.push_str(".datetime()"),
        None => {}
    }
    if let Some(pattern) = &s.pattern {
        let _ = write!(
            out,
            ".regex(new RegExp({}))",
            js_literal(&Value::String(pattern.clone()))
        );
    }
    if let Some(min) = s.min_length {
        let _ = write!(out, ".min({min})");
    }
    if let Some(max) = s.max_length {
        let _ = write!(out, ".max({max})");
    }
    out
}

fn number(n: &NumberSchema) -> String {
    let mut out = String::from("z.number()");
    if n.integer {
        out.push_str(".int()");
    }
    if let Some(step) = &n.multiple_of {
        let _ = write!(out, ".multipleOf({})", js_number(step));
    }
    if let Some(Bound { value, exclusive }) = &n.minimum {
        let method = if *exclusive { "gt" } else { "gte" };
        let _ = write!(out, ".{method}({})", js_number(value));
    }
    if let Some(Bound { value, exclusive }) = &n.maximum {
        let method = if *exclusive { "lt" } else { "lte" };
        let _ = write!(out, ".{method}({})", js_number(value));
    }
    out
}

fn array(a: &ArraySchema) -> String {
    let items = a.items.as_deref().map_or_else(|| "z.any()".to_string(), expression);
    let mut out = format!("z.array({items})");
    if let Some(min) = a.min_items {
        let _ = write!(out, ".min({min})");
    }
    if let Some(max) = a.max_items {
        let _ = write!(out, ".max({max})");
    }
    out
}

fn tuple(t: &TupleSchema) -> String {
    let prefix: Vec<String> = t.prefix.iter().map(expression).collect();
    let mut out = format!("z.tuple([{}])", prefix.join(", "));
    if let Some(rest) = &t.rest {
        let _ = write!(out, ".rest({})", expression(rest));
    }
    out
}

fn object(o: &ObjectSchema) -> String {
    if o.properties.is_empty() {
        return match &o.additional {
            Additional::Forbidden => "z.object({}).strict()".to_string(),
            Additional::Schema(values) => format!("z.record({})", expression(values)),
            Additional::Unspecified | Additional::Allowed => "z.record(z.any())".to_string(),
        };
    }

    let fields: Vec<String> = o
        .properties
        .iter()
        .map(|p| {
            let mut field = expression(&p.schema);
            if !p.required && p.schema.default.is_none() {
                field.push_str(".optional()");
            }
            format!("{}: {field}", js_literal(&Value::String(p.name.clone())))
        })
        .collect();

    let mut out = format!("z.object({{ {} }})", fields.join(", "));
    match &o.additional {
        Additional::Unspecified => {}
        Additional::Allowed => out.push_str(".passthrough()"),
        Additional::Forbidden => out.push_str(".strict()"),
        Additional::Schema(values) => {
            let _ = write!(out, ".catchall({})", expression(values));
        }
    }
    out
}

fn enumeration(values: &[Value]) -> String {
    if let [single] = values {
        return format!("z.literal({})", js_literal(single));
    }
    if values.iter().all(Value::is_string) {
        let items: Vec<String> = values.iter().map(js_literal).collect();
        return format!("z.enum([{}])", items.join(","));
    }
    union(
        values
            .iter()
            .map(|v| format!("z.literal({})", js_literal(v)))
            .collect(),
    )
}

fn union(mut members: Vec<String>) -> String {
    match members.len() {
        0 => "z.never()".to_string(),
        1 => members.remove(0),
        _ => format!("z.union([{}])", members.join(", ")),
    }
}

/// Print `value` as compact JSON with JavaScript number formatting, i.e. the
/// text `JSON.stringify` would produce.
pub fn js_literal(value: &Value) -> String {
    match value {
        Value::Number(n) => js_number(n),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(js_literal).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", js_literal(&Value::String(k.clone())), js_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        other => other.to_string(),
    }
}

/// Integral floats print without a fractional part (`1.0` becomes `1`).
fn js_number(n: &Number) -> String {
    js_integral(n).unwrap_or_else(|| n.clone()).to_string()
}

fn js_integral(n: &Number) -> Option<Number> {
    let f = n.as_f64().filter(|_| n.is_f64())?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| Number::from(f as i64))
}

/// Copy of `value` with numbers normalized the way [`js_literal`] prints
/// them, for output produced through `serde_json` formatting.
pub fn js_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(js_integral(n).unwrap_or_else(|| n.clone())),
        Value::Array(items) => Value::Array(items.iter().map(js_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), js_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
