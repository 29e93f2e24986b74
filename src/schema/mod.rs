//! Avro schemas describing how the codecs lay out dataset payloads.
//!
//! A [`Schema`] is a plain tree. Named nodes (records, enums and derived
//! primitives) carry a [`SchemaName`] and aliases; rendering to Avro JSON
//! writes each named node in full the first time and by its full name after
//! that, which also closes the self reference of `DiagnosticInfo`. The same
//! tree also renders as a JSON Schema for the JSON payload.

mod builtin;
mod datum;
mod deriver;
mod json_schema;

pub use builtin::{BuiltInSchemas, NAMESPACE_ZERO};
pub use datum::AvroDatum;
pub(crate) use deriver::built_in_of;
pub use deriver::{escape, SchemaDeriver};

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;

/// A schema name and the namespace it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaName {
    pub name: String,
    pub namespace: Option<String>,
}

impl SchemaName {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
        }
    }

    /// `namespace.name`, or the bare name without a namespace.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) if !namespace.is_empty() => format!("{}.{}", namespace, self.name),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// The Avro primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Null => "null",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Bytes => "bytes",
            PrimitiveType::String => "string",
        }
    }
}

/// A record field.
///
/// `name` is the Avro name. `json_name` is the member name of the JSON
/// payload when the two differ, e.g. for names with spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub json_name: Option<String>,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            json_name: None,
            schema,
        }
    }

    /// A field named after a display name, escaped for Avro.
    pub fn escaped(display_name: &str, schema: Schema) -> Self {
        let name = escape(display_name);
        let json_name = (name != display_name).then(|| display_name.to_string());
        Self {
            name,
            json_name,
            schema,
        }
    }

    /// The member name of the field in the JSON payload.
    pub fn json_key(&self) -> &str {
        self.json_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive {
        kind: PrimitiveType,
        logical_type: Option<String>,
    },
    /// A named alias of another schema, e.g. `Int64` over `string`.
    Derived {
        name: SchemaName,
        aliases: Vec<String>,
        base: Box<Schema>,
    },
    Record {
        name: SchemaName,
        aliases: Vec<String>,
        fields: Vec<Field>,
    },
    Union(Vec<Schema>),
    Enum {
        name: SchemaName,
        aliases: Vec<String>,
        symbols: Vec<String>,
        default: Option<String>,
    },
    Array(Box<Schema>),
    /// A union of `null` and the inner schema.
    Nullable(Box<Schema>),
    /// A named schema defined elsewhere in the tree.
    Reference(SchemaName),
}

impl Schema {
    pub fn primitive(kind: PrimitiveType) -> Self {
        Schema::Primitive {
            kind,
            logical_type: None,
        }
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveType::Null)
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    /// Wraps in a nullable union. `null` and schemas that already admit
    /// `null` come back unchanged.
    pub fn nullable(self) -> Self {
        if self.is_nullable() {
            return self;
        }
        Schema::Nullable(Box::new(self))
    }

    /// A union of the given schemas. Nested unions are spliced and repeated
    /// members dropped; a single remaining member is returned as is.
    pub fn union(members: impl IntoIterator<Item = Schema>) -> Self {
        fn push(schema: Schema, flat: &mut Vec<Schema>) {
            if !flat.contains(&schema) {
                flat.push(schema);
            }
        }
        let mut flat: Vec<Schema> = Vec::new();
        for member in members {
            match member {
                Schema::Union(inner) => inner.into_iter().for_each(|s| push(s, &mut flat)),
                Schema::Nullable(inner) => {
                    push(Schema::null(), &mut flat);
                    push(*inner, &mut flat);
                }
                other => push(other, &mut flat),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Schema::Union(flat)
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Schema::Nullable(_) => true,
            Schema::Primitive {
                kind: PrimitiveType::Null,
                ..
            } => true,
            Schema::Union(members) => members.iter().any(Schema::is_nullable),
            _ => false,
        }
    }

    /// The name of a named schema.
    pub fn name(&self) -> Option<&SchemaName> {
        match self {
            Schema::Derived { name, .. }
            | Schema::Record { name, .. }
            | Schema::Enum { name, .. }
            | Schema::Reference(name) => Some(name),
            _ => None,
        }
    }

    pub fn aliases(&self) -> &[String] {
        match self {
            Schema::Derived { aliases, .. }
            | Schema::Record { aliases, .. }
            | Schema::Enum { aliases, .. } => aliases,
            _ => &[],
        }
    }

    /// The fields of a record schema.
    pub fn fields(&self) -> &[Field] {
        match self {
            Schema::Record { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|field| field.name == name)
    }

    /// The primitive type at the bottom of derived schemas.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            Schema::Primitive { kind, .. } => Some(*kind),
            Schema::Derived { base, .. } => base.primitive_type(),
            _ => None,
        }
    }

    /// Renders the tree as an Avro schema document.
    pub fn to_avro(&self) -> Value {
        let mut seen = HashSet::new();
        render(self, &mut seen)
    }

    /// Renders the tree as a JSON Schema document describing the JSON
    /// payload.
    pub fn to_json_schema(&self) -> Value {
        json_schema::document(self)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_avro())
    }
}

// --- Rendering ---

fn named_header(map: &mut Map<String, Value>, name: &SchemaName, aliases: &[String]) {
    map.insert("name".to_string(), Value::String(name.name.clone()));
    if let Some(namespace) = &name.namespace {
        map.insert("namespace".to_string(), Value::String(namespace.clone()));
    }
    if !aliases.is_empty() {
        map.insert("aliases".to_string(), json!(aliases));
    }
}

fn render(schema: &Schema, seen: &mut HashSet<String>) -> Value {
    if let Some(name) = schema.name() {
        let full_name = name.full_name();
        if matches!(schema, Schema::Reference(_)) || !seen.insert(full_name.clone()) {
            return Value::String(full_name);
        }
    }
    match schema {
        Schema::Primitive { kind, logical_type } => match logical_type {
            None => Value::String(kind.as_str().to_string()),
            Some(logical_type) => json!({ "type": kind.as_str(), "logicalType": logical_type }),
        },
        Schema::Derived {
            name,
            aliases,
            base,
        } => {
            let mut map = Map::new();
            match base.as_ref() {
                Schema::Primitive { kind, logical_type } => {
                    map.insert("type".to_string(), Value::String(kind.as_str().to_string()));
                    if let Some(logical_type) = logical_type {
                        map.insert("logicalType".to_string(), Value::String(logical_type.clone()));
                    }
                }
                other => {
                    map.insert("type".to_string(), render(other, seen));
                }
            }
            named_header(&mut map, name, aliases);
            Value::Object(map)
        }
        Schema::Record {
            name,
            aliases,
            fields,
        } => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String("record".to_string()));
            named_header(&mut map, name, aliases);
            let fields = fields
                .iter()
                .map(|field| json!({ "name": field.name, "type": render(&field.schema, seen) }))
                .collect();
            map.insert("fields".to_string(), Value::Array(fields));
            Value::Object(map)
        }
        Schema::Enum {
            name,
            aliases,
            symbols,
            default,
        } => {
            let mut map = Map::new();
            map.insert("type".to_string(), Value::String("enum".to_string()));
            named_header(&mut map, name, aliases);
            map.insert("symbols".to_string(), json!(symbols));
            if let Some(default) = default {
                map.insert("default".to_string(), Value::String(default.clone()));
            }
            Value::Object(map)
        }
        Schema::Union(members) => {
            Value::Array(members.iter().map(|member| render(member, seen)).collect())
        }
        Schema::Nullable(inner) => match inner.as_ref() {
            Schema::Union(members) => {
                let mut items = vec![Value::String("null".to_string())];
                items.extend(members.iter().map(|member| render(member, seen)));
                Value::Array(items)
            }
            other => Value::Array(vec![Value::String("null".to_string()), render(other, seen)]),
        },
        Schema::Array(items) => json!({ "type": "array", "items": render(items, seen) }),
        Schema::Reference(name) => Value::String(name.full_name()),
    }
}
