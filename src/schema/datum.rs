use super::{PrimitiveType, Schema};
use crate::binary::{BinaryReader, BinaryWriter};
use crate::json::{float_token, read_f64};
use crate::{EncoderError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Writes and reads JSON payloads in the Avro binary form of a schema.
///
/// A payload is the token tree the JSON codec produces. Records are written
/// field by field in schema order, members matched by their JSON name. A
/// missing or `null` member takes the null branch of a nullable field, and a
/// union writes the index of the first member that accepts the token. Enum symbols travel as their ordinal and
/// read back as the symbol. Reading gives the token tree back with null
/// members left out.
///
/// ```rust
/// use opcua_encoder::schema::{AvroDatum, PrimitiveType, Schema};
/// use opcua_encoder::{BinaryReader, BinaryWriter, EncodingContext};
/// use bytes::BytesMut;
/// use serde_json::json;
///
/// let schema = Schema::primitive(PrimitiveType::String).nullable();
/// let datum = AvroDatum::new(&schema);
/// let context = EncodingContext::default();
/// let mut buffer = BytesMut::new();
/// datum.write(&mut BinaryWriter::new(&mut buffer, &context), &json!("5")).unwrap();
/// assert_eq!(&buffer[..], &[0x02, 0x02, b'5']);
///
/// let mut reader = BinaryReader::new(buffer.freeze(), &context);
/// assert_eq!(datum.read(&mut reader).unwrap(), json!("5"));
/// ```
pub struct AvroDatum<'s> {
    root: &'s Schema,
    named: HashMap<String, &'s Schema>,
}

impl<'s> AvroDatum<'s> {
    pub fn new(root: &'s Schema) -> Self {
        let mut named = HashMap::new();
        collect_named(root, &mut named);
        Self { root, named }
    }

    pub fn schema(&self) -> &'s Schema {
        self.root
    }

    /// Writes `value` under the root schema.
    ///
    /// # Errors
    /// `EncoderError::Encoding` when the token does not fit the schema.
    pub fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> Result<()> {
        self.write_value(writer, self.root, value)
    }

    /// Reads one value of the root schema.
    pub fn read(&self, reader: &mut BinaryReader<'_>) -> Result<Value> {
        self.read_value(reader, self.root)
    }

    /// True when `value` fits `schema`.
    pub fn accepts(&self, schema: &Schema, value: &Value) -> bool {
        match schema {
            Schema::Primitive { kind, .. } => accepts_primitive(*kind, value),
            Schema::Derived { base, .. } => self.accepts(base, value),
            Schema::Record { fields, .. } => {
                let Value::Object(map) = value else {
                    return false;
                };
                map.keys().all(|key| fields.iter().any(|field| field.json_key() == key))
                    && fields.iter().all(|field| match map.get(field.json_key()) {
                        None | Some(Value::Null) => field.schema.is_nullable(),
                        Some(member) => self.accepts(&field.schema, member),
                    })
            }
            Schema::Enum { symbols, .. } => enum_ordinal(symbols, value).is_some(),
            Schema::Array(items) => match value {
                Value::Array(values) => values.iter().all(|item| self.accepts(items, item)),
                _ => false,
            },
            Schema::Nullable(inner) => value.is_null() || self.accepts(inner, value),
            Schema::Union(members) => members.iter().any(|member| self.accepts(member, value)),
            Schema::Reference(name) => self
                .named
                .get(&name.full_name())
                .is_some_and(|schema| self.accepts(schema, value)),
        }
    }

    fn resolve(&self, schema: &'s Schema) -> Result<&'s Schema> {
        match schema {
            Schema::Reference(name) => self.named.get(&name.full_name()).copied().ok_or_else(|| {
                EncoderError::Schema(format!("Unknown schema reference {}", name))
            }),
            other => Ok(other),
        }
    }

    fn write_value(&self, writer: &mut BinaryWriter<'_>, schema: &'s Schema, value: &Value) -> Result<()> {
        match self.resolve(schema)? {
            Schema::Primitive { kind, .. } => write_primitive(writer, *kind, value),
            Schema::Derived { base, .. } => self.write_value(writer, base, value),
            Schema::Record { name, fields, .. } => {
                let Value::Object(map) = value else {
                    return Err(mismatch(schema, value));
                };
                if let Some(key) = map.keys().find(|key| !fields.iter().any(|f| f.json_key() == *key)) {
                    return Err(EncoderError::Encoding(format!(
                        "Record {} has no field {}",
                        name, key
                    )));
                }
                let null = Value::Null;
                writer.with_nesting(|w| {
                    for field in fields {
                        let member = map.get(field.json_key()).unwrap_or(&null);
                        self.write_value(w, &field.schema, member)?;
                    }
                    Ok(())
                })
            }
            Schema::Enum { symbols, .. } => {
                let ordinal = enum_ordinal(symbols, value).ok_or_else(|| mismatch(schema, value))?;
                writer.write_union_index(ordinal);
                Ok(())
            }
            Schema::Array(items) => {
                let Value::Array(values) = value else {
                    return Err(mismatch(schema, value));
                };
                writer.write_array_length(values.len())?;
                writer.with_nesting(|w| {
                    values
                        .iter()
                        .try_for_each(|item| self.write_value(w, items, item))
                })
            }
            Schema::Nullable(inner) => {
                if value.is_null() {
                    writer.write_union_index(0);
                    return Ok(());
                }
                match inner.as_ref() {
                    // The null branch comes first, the members follow it.
                    Schema::Union(members) => self.write_member(writer, members, 1, value),
                    other => {
                        writer.write_union_index(1);
                        self.write_value(writer, other, value)
                    }
                }
            }
            Schema::Union(members) => self.write_member(writer, members, 0, value),
            Schema::Reference(name) => Err(EncoderError::Schema(format!(
                "Unresolved schema reference {}",
                name
            ))),
        }
    }

    fn write_member(
        &self,
        writer: &mut BinaryWriter<'_>,
        members: &'s [Schema],
        offset: u32,
        value: &Value,
    ) -> Result<()> {
        let (index, member) = members
            .iter()
            .enumerate()
            .find(|(_, member)| self.accepts(member, value))
            .ok_or_else(|| {
                EncoderError::Encoding(format!("No union member accepts {}", value))
            })?;
        writer.write_union_index(offset + index as u32);
        self.write_value(writer, member, value)
    }

    fn read_value(&self, reader: &mut BinaryReader<'_>, schema: &'s Schema) -> Result<Value> {
        match self.resolve(schema)? {
            Schema::Primitive { kind, .. } => read_primitive(reader, *kind),
            Schema::Derived { base, .. } => self.read_value(reader, base),
            Schema::Record { fields, .. } => reader.with_nesting(|r| {
                let mut map = Map::new();
                for field in fields {
                    let member = self.read_value(r, &field.schema)?;
                    if !member.is_null() {
                        map.insert(field.json_key().to_string(), member);
                    }
                }
                Ok(Value::Object(map))
            }),
            Schema::Enum { symbols, .. } => {
                let ordinal = reader.read_union_index()?;
                usize::try_from(ordinal)
                    .ok()
                    .and_then(|ordinal| symbols.get(ordinal))
                    .map(|symbol| Value::String(symbol.clone()))
                    .ok_or_else(|| {
                        EncoderError::Decoding(format!(
                            "Enum ordinal {} out of range for {} symbols",
                            ordinal,
                            symbols.len()
                        ))
                    })
            }
            Schema::Array(items) => {
                let length = reader.read_array_length()?;
                reader.with_nesting(|r| {
                    (0..length)
                        .map(|_| self.read_value(r, items))
                        .collect::<Result<Vec<_>>>()
                        .map(Value::Array)
                })
            }
            Schema::Nullable(inner) => {
                let index = reader.read_union_index()?;
                if index == 0 {
                    return Ok(Value::Null);
                }
                match inner.as_ref() {
                    Schema::Union(members) => self.read_member(reader, members, index - 1),
                    other if index == 1 => self.read_value(reader, other),
                    _ => Err(unknown_branch(index)),
                }
            }
            Schema::Union(members) => {
                let index = reader.read_union_index()?;
                self.read_member(reader, members, index)
            }
            Schema::Reference(name) => Err(EncoderError::Schema(format!(
                "Unresolved schema reference {}",
                name
            ))),
        }
    }

    fn read_member(&self, reader: &mut BinaryReader<'_>, members: &'s [Schema], index: i64) -> Result<Value> {
        let member = usize::try_from(index)
            .ok()
            .and_then(|index| members.get(index))
            .ok_or_else(|| unknown_branch(index))?;
        self.read_value(reader, member)
    }
}

fn collect_named<'s>(schema: &'s Schema, named: &mut HashMap<String, &'s Schema>) {
    match schema {
        Schema::Derived { name, base, .. } => {
            named.entry(name.full_name()).or_insert(schema);
            collect_named(base, named);
        }
        Schema::Record { name, fields, .. } => {
            named.entry(name.full_name()).or_insert(schema);
            for field in fields {
                collect_named(&field.schema, named);
            }
        }
        Schema::Enum { name, .. } => {
            named.entry(name.full_name()).or_insert(schema);
        }
        Schema::Array(inner) | Schema::Nullable(inner) => collect_named(inner, named),
        Schema::Union(members) => members.iter().for_each(|member| collect_named(member, named)),
        Schema::Primitive { .. } | Schema::Reference(_) => {}
    }
}

fn mismatch(schema: &Schema, value: &Value) -> EncoderError {
    let expected = match schema.name() {
        Some(name) => name.full_name(),
        None => schema.to_avro().to_string(),
    };
    EncoderError::Encoding(format!("Expected {}, got {}", expected, value))
}

fn unknown_branch(index: i64) -> EncoderError {
    EncoderError::Decoding(format!("Cannot decode unknown union field: {}", index))
}

fn is_non_finite(value: &Value) -> bool {
    matches!(value.as_str(), Some("NaN" | "Infinity" | "-Infinity"))
}

fn accepts_primitive(kind: PrimitiveType, value: &Value) -> bool {
    match kind {
        PrimitiveType::Null => value.is_null(),
        PrimitiveType::Boolean => value.is_boolean(),
        PrimitiveType::Int | PrimitiveType::Long => value.is_i64(),
        // Only values a 32-bit float holds exactly.
        PrimitiveType::Float => {
            is_non_finite(value) || value.as_f64().is_some_and(|v| f64::from(v as f32) == v)
        }
        PrimitiveType::Double => is_non_finite(value) || value.is_number(),
        PrimitiveType::String => value.is_string(),
        PrimitiveType::Bytes => value
            .as_str()
            .is_some_and(|text| STANDARD.decode(text).is_ok()),
    }
}

fn enum_ordinal(symbols: &[String], value: &Value) -> Option<u32> {
    let ordinal = match value {
        Value::String(symbol) => symbols.iter().position(|s| s == symbol)?,
        Value::Number(number) => usize::try_from(number.as_u64()?).ok()?,
        _ => return None,
    };
    (ordinal < symbols.len()).then_some(ordinal as u32)
}

fn write_primitive(writer: &mut BinaryWriter<'_>, kind: PrimitiveType, value: &Value) -> Result<()> {
    let wrong = || EncoderError::Encoding(format!("Expected {}, got {}", kind.as_str(), value));
    match kind {
        PrimitiveType::Null => {
            if !value.is_null() {
                return Err(wrong());
            }
        }
        PrimitiveType::Boolean => writer.write_bool(value.as_bool().ok_or_else(wrong)?),
        PrimitiveType::Int | PrimitiveType::Long => writer.write_long(value.as_i64().ok_or_else(wrong)?),
        PrimitiveType::Float => {
            let number = read_f64(value, "Float").map_err(|_| wrong())?;
            writer.write_float(number as f32);
        }
        PrimitiveType::Double => writer.write_double(read_f64(value, "Double").map_err(|_| wrong())?),
        PrimitiveType::String => writer.write_string(value.as_str().ok_or_else(wrong)?)?,
        PrimitiveType::Bytes => {
            let text = value.as_str().ok_or_else(wrong)?;
            let bytes = STANDARD.decode(text).map_err(|_| wrong())?;
            writer.write_bytes(&bytes)?;
        }
    }
    Ok(())
}

fn read_primitive(reader: &mut BinaryReader<'_>, kind: PrimitiveType) -> Result<Value> {
    Ok(match kind {
        PrimitiveType::Null => Value::Null,
        PrimitiveType::Boolean => Value::Bool(reader.read_bool()?),
        PrimitiveType::Int | PrimitiveType::Long => Value::from(reader.read_long()?),
        PrimitiveType::Float => float_token(f64::from(reader.read_float()?)),
        PrimitiveType::Double => float_token(reader.read_double()?),
        PrimitiveType::String => Value::String(reader.read_string()?),
        PrimitiveType::Bytes => Value::String(STANDARD.encode(reader.read_bytes()?)),
    })
}
