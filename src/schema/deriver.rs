use super::builtin::{numeric_alias, BuiltInSchemas, NAMESPACE_ZERO};
use super::{Field, Schema, SchemaName};
use crate::builtin::BuiltInType;
use crate::dataset::{DataSetFieldContentMask, FieldEncoding};
use crate::metadata::{
    DataSetMetaData, EnumDescription, FieldMetaData, SimpleTypeDescription, StructureDescription,
};
use crate::node_id::{ExpandedNodeId, Identifier};
use crate::{EncoderError, Result};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Makes a string usable as an Avro name: `/` becomes `_` and every other
/// character outside `[A-Za-z0-9_]` becomes `__<code point>`.
pub fn escape(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' => escaped.push('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => escaped.push(c),
            c => {
                escaped.push_str("__");
                escaped.push_str(&u32::from(c).to_string());
            }
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy)]
enum Description<'m> {
    Structure(&'m StructureDescription),
    Simple(&'m SimpleTypeDescription),
    Enum(&'m EnumDescription),
}

/// Derives the Avro schema of a dataset payload from its metadata.
///
/// Type descriptions are registered up front by data type id, the first
/// description of an id winning. Each one then resolves to exactly one
/// schema, computed once; a structure that reaches itself through its
/// fields is a schema error.
///
/// ```rust
/// use opcua_encoder::metadata::{DataSetMetaData, FieldMetaData};
/// use opcua_encoder::{BuiltInType, DataSetFieldContentMask, SchemaDeriver};
///
/// let metadata = DataSetMetaData::new("Motor")
///     .with_field(FieldMetaData::built_in("Speed", BuiltInType::Double));
/// let schema = SchemaDeriver::new(&metadata, DataSetFieldContentMask::NONE)
///     .derive()
///     .unwrap();
/// assert_eq!(schema.name().unwrap().name, "Motor");
/// ```
pub struct SchemaDeriver<'m> {
    metadata: &'m DataSetMetaData,
    content_mask: DataSetFieldContentMask,
    built_ins: BuiltInSchemas,
    descriptions: IndexMap<ExpandedNodeId, Description<'m>>,
    resolved: HashMap<ExpandedNodeId, Schema>,
    resolving: HashSet<ExpandedNodeId>,
}

impl<'m> SchemaDeriver<'m> {
    pub fn new(metadata: &'m DataSetMetaData, content_mask: DataSetFieldContentMask) -> Self {
        let reversible = content_mask.field_encoding() == FieldEncoding::Variant;
        let mut deriver = Self {
            metadata,
            content_mask,
            built_ins: BuiltInSchemas::new(reversible),
            descriptions: IndexMap::new(),
            resolved: HashMap::new(),
            resolving: HashSet::new(),
        };
        deriver.register();
        deriver
    }

    fn register(&mut self) {
        let metadata = self.metadata;
        let descriptions = metadata
            .structures
            .iter()
            .map(|d| (&d.data_type_id, Description::Structure(d)))
            .chain(
                metadata
                    .simple_types
                    .iter()
                    .map(|d| (&d.data_type_id, Description::Simple(d))),
            )
            .chain(
                metadata
                    .enums
                    .iter()
                    .map(|d| (&d.data_type_id, Description::Enum(d))),
            );
        for (data_type_id, description) in descriptions {
            let key = data_type_id.to_absolute(&metadata.namespaces);
            if self.descriptions.contains_key(&key) {
                tracing::trace!(type_id = %key, "duplicate type description ignored");
                continue;
            }
            self.descriptions.insert(key, description);
        }
    }

    /// Resolves every registered description and builds the payload schema.
    ///
    /// # Errors
    /// `EncoderError::Schema` when a field or description names a type that
    /// is neither built in nor described, or when structures form a cycle.
    pub fn derive(mut self) -> Result<Schema> {
        let keys: Vec<ExpandedNodeId> = self.descriptions.keys().cloned().collect();
        for key in &keys {
            self.resolve(key)?;
        }
        let metadata = self.metadata;
        if let [field] = metadata.fields.as_slice() {
            if self.content_mask.degrades_single_field() {
                return self.payload_field_schema(field);
            }
        }
        let mut fields = Vec::with_capacity(metadata.fields.len());
        for field in &metadata.fields {
            fields.push(Field::escaped(&field.name, self.payload_field_schema(field)?));
        }
        Ok(Schema::Record {
            name: SchemaName::new(escape(metadata.name.as_deref().unwrap_or("Payload")), None),
            aliases: Vec::new(),
            fields,
        })
    }

    /// The schema of one dataset field as written in the payload. A field
    /// may carry no value, so the schema always admits `null`.
    fn payload_field_schema(&mut self, field: &FieldMetaData) -> Result<Schema> {
        let schema = self.lookup(&field.data_type, true, field.array_rank(), true)?;
        if self.content_mask.field_encoding() != FieldEncoding::DataValue {
            return Ok(schema.nullable());
        }
        Ok(self
            .built_ins
            .data_value_record(
                SchemaName::new(format!("{}DataValue", escape(&field.name)), None),
                Vec::new(),
                schema,
            )
            .nullable())
    }

    /// The schema of a field value: nullable when the type's JSON form can be
    /// `null`, and one array level per rank for array fields.
    pub fn field_schema(&mut self, field: &FieldMetaData) -> Result<Schema> {
        self.lookup(&field.data_type, true, field.array_rank(), false)
    }

    /// The schema of a data type id.
    pub fn type_schema(&mut self, data_type: &ExpandedNodeId) -> Result<Schema> {
        self.lookup(data_type, false, 0, false)
    }

    // Payload values are written as variant bodies: reversible structures keep
    // their extension object envelope and abstract types keep the variant.
    fn lookup(
        &mut self,
        data_type: &ExpandedNodeId,
        nullable: bool,
        rank: usize,
        payload: bool,
    ) -> Result<Schema> {
        let key = data_type.to_absolute(&self.metadata.namespaces);
        let mut schema = if let Some(description) = self.descriptions.get(&key).copied() {
            let mut schema = self.resolve(&key)?;
            if payload && self.built_ins.is_reversible() {
                if let Description::Structure(_) = description {
                    schema = self.envelope(&key, schema);
                }
            }
            if nullable {
                schema.nullable()
            } else {
                schema
            }
        } else {
            let built_in_type = built_in_of(&key)
                .ok_or_else(|| EncoderError::Schema(format!("No schema found for {}", data_type)))?;
            let built_in_type = if payload && built_in_type.is_abstract() {
                BuiltInType::Variant
            } else {
                built_in_type
            };
            if nullable {
                self.built_ins.get_nullable(built_in_type)
            } else {
                self.built_ins.get(built_in_type)
            }
        };
        if rank == 0 {
            return Ok(schema);
        }
        for _ in 0..rank {
            schema = Schema::array(schema);
        }
        Ok(if nullable { schema.nullable() } else { schema })
    }

    /// The reversible `{TypeId, Body}` extension object around a structure.
    fn envelope(&mut self, key: &ExpandedNodeId, body: Schema) -> Schema {
        let (namespace, _) = self.split_type_id(key);
        let name = body.name().map(|name| name.name.clone()).unwrap_or_default();
        Schema::Record {
            name: SchemaName::new(format!("{}ExtensionObject", name), Some(&namespace)),
            aliases: Vec::new(),
            fields: vec![
                Field::new(
                    "TypeId",
                    self.built_ins.get(BuiltInType::ExpandedNodeId).nullable(),
                ),
                Field::new("Body", body.nullable()),
            ],
        }
    }

    fn resolve(&mut self, key: &ExpandedNodeId) -> Result<Schema> {
        if let Some(schema) = self.resolved.get(key) {
            return Ok(schema.clone());
        }
        let Some(description) = self.descriptions.get(key).copied() else {
            return Err(EncoderError::Schema(format!("No schema found for {}", key)));
        };
        if !self.resolving.insert(key.clone()) {
            return Err(EncoderError::Schema(format!(
                "Type {} refers to itself through its fields",
                key
            )));
        }
        tracing::trace!(type_id = %key, "resolving type description");
        let result = match description {
            Description::Structure(d) => self.structure(key, d),
            Description::Simple(d) => self.simple_type(key, d),
            Description::Enum(d) => self.enumeration(key, d),
        };
        self.resolving.remove(key);
        let schema = result?;
        self.resolved.insert(key.clone(), schema.clone());
        Ok(schema)
    }

    fn structure(&mut self, key: &ExpandedNodeId, description: &StructureDescription) -> Result<Schema> {
        let mut fields = Vec::with_capacity(description.fields.len());
        for field in &description.fields {
            let schema = self.field_schema(field)?;
            fields.push(Field::escaped(&field.name, schema));
        }
        let (namespace, alias) = self.split_type_id(key);
        Ok(Schema::Record {
            name: SchemaName::new(escape(&description.name), Some(&namespace)),
            aliases: vec![alias],
            fields,
        })
    }

    fn simple_type(&mut self, key: &ExpandedNodeId, description: &SimpleTypeDescription) -> Result<Schema> {
        if let Some(built_in_type) = description.built_in_type {
            if built_in_of(key) == Some(built_in_type) {
                return Ok(self.built_ins.get(built_in_type));
            }
        }
        let base = match &description.base_data_type {
            Some(base) => self.type_schema(base)?,
            None => self
                .built_ins
                .get(description.built_in_type.unwrap_or(BuiltInType::String)),
        };
        let (namespace, alias) = self.split_type_id(key);
        Ok(Schema::Derived {
            name: SchemaName::new(escape(&description.name), Some(&namespace)),
            aliases: vec![alias],
            base: Box::new(base),
        })
    }

    fn enumeration(&mut self, key: &ExpandedNodeId, description: &EnumDescription) -> Result<Schema> {
        let symbols: Vec<String> = description.fields.iter().map(|f| escape(&f.name)).collect();
        if symbols.is_empty() {
            return Err(EncoderError::Schema(format!(
                "Enumeration {} has no fields",
                description.name
            )));
        }
        let (namespace, alias) = self.split_type_id(key);
        Ok(Schema::Enum {
            name: SchemaName::new(escape(&description.name), Some(&namespace)),
            aliases: vec![alias],
            default: symbols.first().cloned(),
            symbols,
        })
    }

    /// The Avro namespace and alias of a data type id.
    fn split_type_id(&self, key: &ExpandedNodeId) -> (String, String) {
        let namespace = match &key.namespace_uri {
            None if key.node_id.namespace == 0 => NAMESPACE_ZERO.to_string(),
            None => format!("ns{}", key.node_id.namespace),
            Some(uri) => avro_namespace(uri),
        };
        let alias = match &key.node_id.identifier {
            Identifier::Numeric(id) => numeric_alias(*id),
            Identifier::String(_) => format!("s_{}", key.node_id.identifier.value_string()),
            Identifier::Guid(_) => format!("g_{}", key.node_id.identifier.value_string()),
            Identifier::Opaque(_) => format!("b_{}", key.node_id.identifier.value_string()),
        };
        (namespace, escape(&alias))
    }
}

/// A built-in type id `i=0` to `i=29` in namespace zero.
pub(crate) fn built_in_of(key: &ExpandedNodeId) -> Option<BuiltInType> {
    if key.namespace_uri.is_some() || key.node_id.namespace != 0 {
        return None;
    }
    match key.node_id.identifier {
        Identifier::Numeric(id) => BuiltInType::from_id(id),
        _ => None,
    }
}

/// Reversed host labels followed by the path segments, e.g.
/// `http://opcfoundation.org/UA/DI/` becomes `org.opcfoundation.UA.DI`.
fn avro_namespace(uri: &str) -> String {
    let segments: Vec<String> = match Url::parse(uri) {
        Ok(url) if url.host_str().is_some() => {
            let host = url.host_str().unwrap_or_default();
            host.split('.')
                .rev()
                .chain(url.path_segments().into_iter().flatten())
                .filter(|segment| !segment.is_empty())
                .map(escape)
                .collect()
        }
        _ => uri
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(escape)
            .collect(),
    };
    segments.join(".")
}
