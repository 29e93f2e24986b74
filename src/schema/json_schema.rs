//! Renders a [`Schema`] tree as a JSON Schema (draft 2020-12) document.
//!
//! The tree already has the shape the JSON codec writes in the mode it was
//! derived for, so one rendering serves both the reversible and the
//! non-reversible payloads. Named nodes become `$defs` entries keyed by their
//! full name and are referenced with `$ref`, which also closes the self
//! reference of `DiagnosticInfo`. Record members use their JSON names.

use super::{PrimitiveType, Schema, SchemaName, NAMESPACE_ZERO};
use serde_json::{json, Map, Value};

const DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

const NON_FINITE: [&str; 3] = ["NaN", "Infinity", "-Infinity"];

pub(crate) fn document(root: &Schema) -> Value {
    let mut defs = Map::new();
    let mut map = match render(root, &mut defs) {
        Value::Object(map) => map,
        other => Map::from_iter([("allOf".to_string(), json!([other]))]),
    };
    map.insert("$schema".to_string(), Value::String(DIALECT.to_string()));
    if !defs.is_empty() {
        map.insert("$defs".to_string(), Value::Object(defs));
    }
    Value::Object(map)
}

/// `#/$defs/<full name>`, escaped as a JSON pointer token.
fn reference(name: &SchemaName) -> String {
    let token = name.full_name().replace('~', "~0").replace('/', "~1");
    format!("#/$defs/{}", token)
}

fn render(schema: &Schema, defs: &mut Map<String, Value>) -> Value {
    match schema {
        Schema::Primitive { kind, logical_type } => {
            let mut rendered = primitive(*kind);
            if let (Some(logical_type), Value::Object(map)) = (logical_type, &mut rendered) {
                map.insert("format".to_string(), Value::String(logical_type.clone()));
            }
            rendered
        }
        Schema::Derived { name, base, .. } => define(name, defs, |defs| {
            let mut map = match render(base, defs) {
                Value::Object(map) => map,
                other => Map::from_iter([("allOf".to_string(), json!([other]))]),
            };
            if name.namespace.as_deref() == Some(NAMESPACE_ZERO) {
                built_in_constraints(&name.name, &mut map);
            }
            map.insert("title".to_string(), Value::String(name.name.clone()));
            Value::Object(map)
        }),
        Schema::Record { name, fields, .. } => define(name, defs, |defs| {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for field in fields {
                properties.insert(field.json_key().to_string(), render(&field.schema, defs));
                if !field.schema.is_nullable() {
                    required.push(Value::String(field.json_key().to_string()));
                }
            }
            let mut map = Map::new();
            map.insert("title".to_string(), Value::String(name.name.clone()));
            map.insert("type".to_string(), json!("object"));
            map.insert("properties".to_string(), Value::Object(properties));
            if !required.is_empty() {
                map.insert("required".to_string(), Value::Array(required));
            }
            map.insert("additionalProperties".to_string(), Value::Bool(false));
            Value::Object(map)
        }),
        Schema::Enum { name, symbols, .. } => define(name, defs, |_| {
            json!({ "title": name.name, "enum": symbols })
        }),
        Schema::Array(items) => json!({ "type": "array", "items": render(items, defs) }),
        Schema::Nullable(inner) => {
            let mut members = vec![json!({ "type": "null" })];
            match inner.as_ref() {
                Schema::Union(inner) => members.extend(inner.iter().map(|m| render(m, defs))),
                other => members.push(render(other, defs)),
            }
            json!({ "anyOf": members })
        }
        Schema::Union(members) => {
            json!({ "anyOf": members.iter().map(|m| render(m, defs)).collect::<Vec<_>>() })
        }
        Schema::Reference(name) => json!({ "$ref": reference(name) }),
    }
}

/// Renders a named node into `defs` once and answers a reference to it.
fn define(
    name: &SchemaName,
    defs: &mut Map<String, Value>,
    build: impl FnOnce(&mut Map<String, Value>) -> Value,
) -> Value {
    let key = name.full_name();
    if !defs.contains_key(&key) {
        // Placeholder so a self reference met while building stops here.
        defs.insert(key.clone(), Value::Bool(true));
        let definition = build(defs);
        defs.insert(key, definition);
    }
    json!({ "$ref": reference(name) })
}

fn primitive(kind: PrimitiveType) -> Value {
    match kind {
        PrimitiveType::Null => json!({ "type": "null" }),
        PrimitiveType::Boolean => json!({ "type": "boolean" }),
        PrimitiveType::Int => json!({ "type": "integer", "format": "int32" }),
        PrimitiveType::Long => json!({ "type": "integer", "format": "int64" }),
        PrimitiveType::Float | PrimitiveType::Double => json!({
            "anyOf": [{ "type": "number" }, { "enum": NON_FINITE }]
        }),
        PrimitiveType::Bytes => json!({ "type": "string", "contentEncoding": "base64" }),
        PrimitiveType::String => json!({ "type": "string" }),
    }
}

/// Ranges and formats of the built-in scalars.
fn built_in_constraints(name: &str, map: &mut Map<String, Value>) {
    let (format, range): (&str, Option<(i64, i64)>) = match name {
        "SByte" => ("int8", Some((i64::from(i8::MIN), i64::from(i8::MAX)))),
        "Byte" => ("uint8", Some((0, i64::from(u8::MAX)))),
        "Int16" => ("int16", Some((i64::from(i16::MIN), i64::from(i16::MAX)))),
        "UInt16" => ("uint16", Some((0, i64::from(u16::MAX)))),
        "Int32" => ("int32", Some((i64::from(i32::MIN), i64::from(i32::MAX)))),
        "UInt32" | "StatusCode" => ("uint32", Some((0, i64::from(u32::MAX)))),
        "Int64" => ("int64", None),
        "UInt64" => ("uint64", None),
        "Float" => ("float", None),
        "Double" => ("double", None),
        "DateTime" => ("date-time", None),
        _ => return,
    };
    map.insert("format".to_string(), Value::String(format.to_string()));
    if let Some((minimum, maximum)) = range {
        map.insert("minimum".to_string(), Value::from(minimum));
        map.insert("maximum".to_string(), Value::from(maximum));
    }
}
