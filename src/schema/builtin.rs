use super::{Field, PrimitiveType, Schema, SchemaName};
use crate::builtin::BuiltInType;
use std::collections::HashMap;

/// The Avro namespace of the OPC UA built-in types.
pub const NAMESPACE_ZERO: &str = "org.opcfoundation.ua";

/// The alias of a type in namespace zero: `i_<id>`.
pub(crate) fn numeric_alias(id: u32) -> String {
    format!("i_{}", id)
}

/// The schemas of the 30 built-in types for one JSON encoding mode.
///
/// Shapes follow what the JSON codec writes in that mode: 64-bit integers
/// are strings, StatusCode is a bare number when reversible and a
/// `{Code, Symbol}` record otherwise, and so on. Record members the codec
/// leaves out at their default are nullable. Schemas are built on first use
/// and kept for the lifetime of the table.
#[derive(Debug, Clone)]
pub struct BuiltInSchemas {
    reversible: bool,
    cache: HashMap<BuiltInType, Schema>,
}

impl BuiltInSchemas {
    pub fn new(reversible: bool) -> Self {
        Self {
            reversible,
            cache: HashMap::new(),
        }
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn get(&mut self, built_in_type: BuiltInType) -> Schema {
        if let Some(schema) = self.cache.get(&built_in_type) {
            return schema.clone();
        }
        let schema = self.build(built_in_type);
        self.cache.insert(built_in_type, schema.clone());
        schema
    }

    /// The schema, wrapped as nullable when the type's JSON form may be `null`.
    pub fn get_nullable(&mut self, built_in_type: BuiltInType) -> Schema {
        let schema = self.get(built_in_type);
        if built_in_type.is_nullable_in_json() {
            schema.nullable()
        } else {
            schema
        }
    }

    fn build(&mut self, built_in_type: BuiltInType) -> Schema {
        use BuiltInType as B;
        use PrimitiveType as P;
        match built_in_type {
            B::Null => Schema::null(),
            B::Boolean => derived(built_in_type, P::Boolean),
            B::SByte | B::Byte | B::Int16 | B::UInt16 | B::Int32 | B::UInt32 => {
                derived(built_in_type, P::Int)
            }
            B::Int64 | B::UInt64 => derived(built_in_type, P::String),
            B::Float => derived(built_in_type, P::Float),
            B::Double => derived(built_in_type, P::Double),
            B::String | B::DateTime | B::XmlElement => derived(built_in_type, P::String),
            B::Guid => derived_over(
                built_in_type,
                Schema::Primitive {
                    kind: P::String,
                    logical_type: Some("uuid".to_string()),
                },
            ),
            B::ByteString => derived(built_in_type, P::Bytes),
            B::NodeId => self.node_id(),
            B::ExpandedNodeId => self.expanded_node_id(),
            B::StatusCode => self.status_code(),
            B::QualifiedName => self.qualified_name(),
            B::LocalizedText => self.localized_text(),
            B::ExtensionObject => self.extension_object(),
            B::DataValue => self.data_value(),
            B::Variant => self.variant(),
            B::DiagnosticInfo => self.diagnostic_info(),
            B::Number | B::Integer | B::UInteger => derived(built_in_type, P::String),
            B::Enumeration => {
                if self.reversible {
                    derived(built_in_type, P::Int)
                } else {
                    derived(built_in_type, P::String)
                }
            }
        }
    }

    // IdType and Encoding are written as numbers, so they stay bytes here.
    fn identifier_fields(&mut self) -> [Field; 2] {
        let id_type = self.get(BuiltInType::Byte);
        let id = Schema::union([
            self.get(BuiltInType::UInt32),
            self.get(BuiltInType::String),
            self.get(BuiltInType::Guid),
            self.get(BuiltInType::ByteString),
        ]);
        [Field::new("IdType", id_type.nullable()), Field::new("Id", id)]
    }

    /// An index, or a URI where the table resolves one.
    fn index_or_uri(&mut self) -> Schema {
        Schema::union([self.get(BuiltInType::UInt32), self.get(BuiltInType::String)]).nullable()
    }

    fn node_id(&mut self) -> Schema {
        let [id_type, id] = self.identifier_fields();
        let namespace = self.index_or_uri();
        record(
            BuiltInType::NodeId,
            vec![id_type, id, Field::new("Namespace", namespace)],
        )
    }

    fn expanded_node_id(&mut self) -> Schema {
        let [id_type, id] = self.identifier_fields();
        let namespace = self.index_or_uri();
        let server = self.index_or_uri();
        record(
            BuiltInType::ExpandedNodeId,
            vec![
                id_type,
                id,
                Field::new("Namespace", namespace),
                Field::new("ServerUri", server),
            ],
        )
    }

    fn status_code(&mut self) -> Schema {
        if self.reversible {
            return derived(BuiltInType::StatusCode, PrimitiveType::Int);
        }
        record(
            BuiltInType::StatusCode,
            vec![
                Field::new("Code", self.get(BuiltInType::UInt32)),
                Field::new("Symbol", self.get(BuiltInType::String).nullable()),
            ],
        )
    }

    fn qualified_name(&mut self) -> Schema {
        let name = Field::new("Name", self.get(BuiltInType::String).nullable());
        if self.reversible {
            let uri = self.get(BuiltInType::UInt32).nullable();
            return record(BuiltInType::QualifiedName, vec![name, Field::new("Uri", uri)]);
        }
        // Namespaces without a URI in the table keep their index.
        let uri = self.get(BuiltInType::String).nullable();
        let index = self.get(BuiltInType::UInt32).nullable();
        record(
            BuiltInType::QualifiedName,
            vec![name, Field::new("Uri", uri), Field::new("Index", index)],
        )
    }

    fn localized_text(&mut self) -> Schema {
        if !self.reversible {
            return derived(BuiltInType::LocalizedText, PrimitiveType::String);
        }
        record(
            BuiltInType::LocalizedText,
            vec![
                Field::new("Locale", self.get(BuiltInType::String).nullable()),
                Field::new("Text", self.get(BuiltInType::String).nullable()),
            ],
        )
    }

    fn extension_object(&mut self) -> Schema {
        let body = Schema::union([
            Schema::null(),
            self.get(BuiltInType::String),
            self.get(BuiltInType::XmlElement),
            self.get(BuiltInType::ByteString),
        ]);
        if !self.reversible {
            return body;
        }
        let encoding = self.get(BuiltInType::Byte);
        record(
            BuiltInType::ExtensionObject,
            vec![
                Field::new("TypeId", self.get(BuiltInType::ExpandedNodeId).nullable()),
                Field::new("Encoding", encoding.nullable()),
                Field::new("Body", body),
            ],
        )
    }

    fn data_value(&mut self) -> Schema {
        let value = self.get(BuiltInType::Variant);
        self.data_value_record(
            SchemaName::new(BuiltInType::DataValue.name(), Some(NAMESPACE_ZERO)),
            vec![numeric_alias(u32::from(BuiltInType::DataValue.id()))],
            value,
        )
    }

    /// The data value record around `value`. Every member is left out of the
    /// JSON form at its default, so every member is nullable.
    pub fn data_value_record(&mut self, name: SchemaName, aliases: Vec<String>, value: Schema) -> Schema {
        let status = self.get(BuiltInType::StatusCode).nullable();
        let timestamp = self.get(BuiltInType::DateTime).nullable();
        let picoseconds = self.get(BuiltInType::UInt16).nullable();
        Schema::Record {
            name,
            aliases,
            fields: vec![
                Field::new("Value", value.nullable()),
                Field::new("StatusCode", status),
                Field::new("SourceTimestamp", timestamp.clone()),
                Field::new("SourcePicoseconds", picoseconds.clone()),
                Field::new("ServerTimestamp", timestamp),
                Field::new("ServerPicoseconds", picoseconds),
            ],
        }
    }

    /// Every scalar and one-dimensional array a variant body can hold.
    fn variant_body(&mut self) -> Schema {
        let element_types: Vec<BuiltInType> = BuiltInType::ALL
            .into_iter()
            .filter(|t| {
                !t.is_abstract()
                    && !matches!(
                        t,
                        BuiltInType::Variant
                            | BuiltInType::DataValue
                            | BuiltInType::DiagnosticInfo
                            | BuiltInType::ExtensionObject
                    )
            })
            .collect();
        let scalars: Vec<Schema> = element_types.iter().map(|t| self.get(*t)).collect();
        let arrays: Vec<Schema> = element_types
            .iter()
            .filter(|t| **t != BuiltInType::Null)
            .map(|t| Schema::array(self.get(*t)))
            .collect();
        Schema::union(scalars.into_iter().chain(arrays))
    }

    fn variant(&mut self) -> Schema {
        let body = self.variant_body();
        if !self.reversible {
            return body;
        }
        record(
            BuiltInType::Variant,
            vec![
                Field::new("Type", self.get(BuiltInType::Byte)),
                Field::new("Body", body.nullable()),
                Field::new(
                    "Dimensions",
                    Schema::array(self.get(BuiltInType::Int32)).nullable(),
                ),
            ],
        )
    }

    fn diagnostic_info(&mut self) -> Schema {
        let name = SchemaName::new(BuiltInType::DiagnosticInfo.name(), Some(NAMESPACE_ZERO));
        let int32 = self.get(BuiltInType::Int32).nullable();
        record(
            BuiltInType::DiagnosticInfo,
            vec![
                Field::new("SymbolicId", int32.clone()),
                Field::new("NamespaceUri", int32.clone()),
                Field::new("Locale", int32.clone()),
                Field::new("LocalizedText", int32),
                Field::new("AdditionalInfo", self.get(BuiltInType::String).nullable()),
                Field::new("InnerStatusCode", self.get(BuiltInType::StatusCode).nullable()),
                Field::new("InnerDiagnosticInfo", Schema::Reference(name).nullable()),
            ],
        )
    }
}

fn derived(built_in_type: BuiltInType, kind: PrimitiveType) -> Schema {
    derived_over(built_in_type, Schema::primitive(kind))
}

fn derived_over(built_in_type: BuiltInType, base: Schema) -> Schema {
    Schema::Derived {
        name: SchemaName::new(built_in_type.name(), Some(NAMESPACE_ZERO)),
        aliases: vec![numeric_alias(u32::from(built_in_type.id()))],
        base: Box::new(base),
    }
}

fn record(built_in_type: BuiltInType, fields: Vec<Field>) -> Schema {
    Schema::Record {
        name: SchemaName::new(built_in_type.name(), Some(NAMESPACE_ZERO)),
        aliases: vec![numeric_alias(u32::from(built_in_type.id()))],
        fields,
    }
}
