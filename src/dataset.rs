//! Dataset payloads: an ordered set of named field values written as raw
//! variants or as data values, depending on the field content mask.
//!
//! The JSON payload has the shape [`SchemaDeriver`] derives for the same
//! metadata and mask, and the binary payload is that JSON payload in the
//! Avro binary form of the derived schema. A field declared with a concrete
//! type carries the body of its value; only fields declared as `Variant` or
//! an abstract type carry the full variant.

use crate::binary::{BinaryReader, BinaryWriter};
use crate::builtin::BuiltInType;
use crate::composite::DataValue;
use crate::context::EncodingContext;
use crate::date_time::DateTime;
use crate::json::{
    encode_data_value_members, encode_variant_body, JsonEncodingMode, JsonReader, JsonWriter,
};
use crate::metadata::{DataSetMetaData, EnumDescription, FieldMetaData};
use crate::schema::{built_in_of, escape, AvroDatum, SchemaDeriver};
use crate::status_code::StatusCode;
use crate::variant::{Array, Variant};
use crate::{EncoderError, JsonDecoder, JsonEncoder, Result};
use bytes::{Bytes, BytesMut};
use serde_json::{json, Value};
use std::fmt;
use std::ops::BitOr;

/// Selects which parts of a field's data value are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataSetFieldContentMask(pub u32);

impl DataSetFieldContentMask {
    pub const NONE: Self = Self(0);
    pub const STATUS_CODE: Self = Self(0x0000_0001);
    pub const SOURCE_TIMESTAMP: Self = Self(0x0000_0002);
    pub const SERVER_TIMESTAMP: Self = Self(0x0000_0004);
    pub const SOURCE_PICO_SECONDS: Self = Self(0x0000_0008);
    pub const SERVER_PICO_SECONDS: Self = Self(0x0000_0010);
    pub const RAW_DATA: Self = Self(0x0000_0020);
    /// A dataset with a single field is written as that field's bare value.
    pub const SINGLE_FIELD_DEGRADE_TO_VALUE: Self = Self(0x0001_0000);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// How field values are represented under this mask.
    pub fn field_encoding(self) -> FieldEncoding {
        if self.contains(Self::RAW_DATA) {
            FieldEncoding::RawData
        } else if (self.0 & !Self::SINGLE_FIELD_DEGRADE_TO_VALUE.0) == 0 {
            FieldEncoding::Variant
        } else {
            FieldEncoding::DataValue
        }
    }

    pub fn degrades_single_field(self) -> bool {
        self.contains(Self::SINGLE_FIELD_DEGRADE_TO_VALUE)
    }

    /// Keeps only the data value members this mask selects.
    fn apply(self, value: &DataValue) -> DataValue {
        let pick = |flag: Self| self.contains(flag);
        DataValue {
            value: value.value.clone(),
            status: if pick(Self::STATUS_CODE) {
                value.status
            } else {
                StatusCode::GOOD
            },
            source_timestamp: if pick(Self::SOURCE_TIMESTAMP) {
                value.source_timestamp
            } else {
                DateTime::MIN
            },
            source_picoseconds: if pick(Self::SOURCE_PICO_SECONDS) {
                value.source_picoseconds
            } else {
                0
            },
            server_timestamp: if pick(Self::SERVER_TIMESTAMP) {
                value.server_timestamp
            } else {
                DateTime::MIN
            },
            server_picoseconds: if pick(Self::SERVER_PICO_SECONDS) {
                value.server_picoseconds
            } else {
                0
            },
        }
    }
}

impl BitOr for DataSetFieldContentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<u32> for DataSetFieldContentMask {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for DataSetFieldContentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// The representation of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Values in non-reversible JSON.
    RawData,
    /// Values in reversible JSON.
    Variant,
    /// Data value records in non-reversible JSON.
    DataValue,
}

impl FieldEncoding {
    pub fn json_mode(self) -> JsonEncodingMode {
        match self {
            FieldEncoding::Variant => JsonEncodingMode::reversible(),
            FieldEncoding::RawData | FieldEncoding::DataValue => JsonEncodingMode::non_reversible(),
        }
    }
}

/// How one field's value is written, resolved from its declared data type.
#[derive(Debug, Clone, Copy)]
enum Carrier<'m> {
    /// The body of a value of this concrete built-in type.
    Typed(BuiltInType),
    /// A full variant, for `Variant`, abstract and unknown types.
    Variant,
    /// An enumeration, written as its symbol.
    Enum(&'m EnumDescription),
}

impl<'m> Carrier<'m> {
    fn of(metadata: &'m DataSetMetaData, field: &FieldMetaData) -> Self {
        let namespaces = &metadata.namespaces;
        let mut key = field.data_type.to_absolute(namespaces);
        // A simple type chain ends within one step per description.
        for _ in 0..=metadata.simple_types.len() {
            if metadata
                .structures
                .iter()
                .any(|d| d.data_type_id.to_absolute(namespaces) == key)
            {
                return Carrier::Typed(BuiltInType::ExtensionObject);
            }
            if let Some(simple) = metadata
                .simple_types
                .iter()
                .find(|d| d.data_type_id.to_absolute(namespaces) == key)
            {
                match (&simple.base_data_type, simple.built_in_type) {
                    (_, Some(t)) if built_in_of(&key) == Some(t) => return Self::built_in(t),
                    (Some(base), _) => key = base.to_absolute(namespaces),
                    (None, built_in_type) => {
                        return Self::built_in(built_in_type.unwrap_or(BuiltInType::String))
                    }
                }
                continue;
            }
            if let Some(description) = metadata
                .enums
                .iter()
                .find(|d| d.data_type_id.to_absolute(namespaces) == key)
            {
                return Carrier::Enum(description);
            }
            return built_in_of(&key).map_or(Carrier::Variant, Self::built_in);
        }
        Carrier::Variant
    }

    fn built_in(built_in_type: BuiltInType) -> Self {
        if built_in_type.is_abstract()
            || matches!(built_in_type, BuiltInType::Variant | BuiltInType::Null)
        {
            return Carrier::Variant;
        }
        Carrier::Typed(built_in_type)
    }

    fn encode(
        self,
        writer: &mut JsonWriter<'_>,
        field: &FieldMetaData,
        value: &Variant,
        name: Option<&str>,
    ) -> Result<()> {
        if value.is_null() {
            return writer.write_null(name);
        }
        match self {
            Carrier::Variant => value.encode_json(writer, name),
            Carrier::Typed(built_in_type) => {
                let value = as_declared(field, built_in_type, value)?;
                encode_variant_body(writer, &value, name)
            }
            Carrier::Enum(description) => {
                let token = match value {
                    Variant::Int32(v) | Variant::Enumeration(v) if field.array_rank() == 0 => {
                        Value::String(symbol_of(description, *v)?)
                    }
                    Variant::Array(Array::Int32(values) | Array::Enumeration(values))
                        if field.array_rank() == 1 =>
                    {
                        values
                            .iter()
                            .map(|v| symbol_of(description, *v).map(Value::String))
                            .collect::<Result<Vec<_>>>()
                            .map(Value::Array)?
                    }
                    other => return Err(wrong_type(field, other)),
                };
                writer.write_value(name, token)
            }
        }
    }

    fn decode(self, token: &Value, reader: &mut JsonReader<'_>) -> Result<Variant> {
        if token.is_null() {
            return Ok(Variant::Null);
        }
        match self {
            Carrier::Variant => Variant::decode_json(token, reader),
            Carrier::Typed(built_in_type) => {
                Variant::decode_json(&json!({ "Type": built_in_type.id(), "Body": token }), reader)
            }
            Carrier::Enum(description) => match token {
                Value::Array(items) => {
                    reader.check_array_length(items.len())?;
                    items
                        .iter()
                        .map(|item| value_of(description, item))
                        .collect::<Result<Vec<_>>>()
                        .map(|values| Variant::Array(Array::Int32(values)))
                }
                other => value_of(description, other).map(Variant::Int32),
            },
        }
    }
}

/// The value in the declared type. Enumerations stand in for Int32 and back.
fn as_declared(field: &FieldMetaData, built_in_type: BuiltInType, value: &Variant) -> Result<Variant> {
    let expected_rank = match field.array_rank() {
        0 => -1,
        rank => i32::try_from(rank).unwrap_or(i32::MAX),
    };
    if value.value_rank() != expected_rank {
        return Err(wrong_type(field, value));
    }
    let actual = value.built_in_type();
    if actual == built_in_type {
        return Ok(value.clone());
    }
    let converted = match (built_in_type, value) {
        (BuiltInType::Int32, Variant::Enumeration(v)) => Variant::Int32(*v),
        (BuiltInType::Enumeration, Variant::Int32(v)) => Variant::Enumeration(*v),
        (BuiltInType::Int32, Variant::Array(Array::Enumeration(values))) => {
            Variant::Array(Array::Int32(values.clone()))
        }
        (BuiltInType::Enumeration, Variant::Array(Array::Int32(values))) => {
            Variant::Array(Array::Enumeration(values.clone()))
        }
        _ => return Err(wrong_type(field, value)),
    };
    Ok(converted)
}

fn wrong_type(field: &FieldMetaData, value: &Variant) -> EncoderError {
    EncoderError::Encoding(format!(
        "Field {} of type {} cannot hold a {} value of rank {}",
        field.name,
        field.data_type,
        value.built_in_type(),
        value.value_rank()
    ))
}

fn symbol_of(description: &EnumDescription, value: i32) -> Result<String> {
    description
        .fields
        .iter()
        .find(|field| field.value == i64::from(value))
        .map(|field| escape(&field.name))
        .ok_or_else(|| {
            EncoderError::Encoding(format!(
                "{} is not a value of enumeration {}",
                value, description.name
            ))
        })
}

/// Reads an enumeration from its symbol or its numeric value.
fn value_of(description: &EnumDescription, token: &Value) -> Result<i32> {
    let value = match token {
        Value::String(symbol) => description
            .fields
            .iter()
            .find(|field| field.name == *symbol || escape(&field.name) == *symbol)
            .map(|field| field.value),
        Value::Number(number) => number.as_i64(),
        _ => None,
    };
    value
        .and_then(|value| i32::try_from(value).ok())
        .ok_or_else(|| {
            EncoderError::Decoding(format!(
                "{} is not a value of enumeration {}",
                token, description.name
            ))
        })
}

/// A set of named field values in wire order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    pub content_mask: DataSetFieldContentMask,
    pub fields: Vec<(String, DataValue)>,
}

impl DataSet {
    pub fn new(content_mask: DataSetFieldContentMask) -> Self {
        Self {
            content_mask,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Writes the dataset in the Avro binary form of the schema derived for
    /// `metadata` and the content mask.
    ///
    /// # Errors
    /// `EncoderError::Schema` when no schema can be derived, and
    /// `EncoderError::Encoding` when a value does not fit its field.
    pub fn encode_with(&self, writer: &mut BinaryWriter<'_>, metadata: &DataSetMetaData) -> Result<()> {
        let schema = SchemaDeriver::new(metadata, self.content_mask).derive()?;
        let mode = self.content_mask.field_encoding().json_mode();
        let mut json = JsonWriter::new(writer.context(), mode);
        self.encode_json_with(&mut json, None, metadata)?;
        AvroDatum::new(&schema).write(writer, &json.finish()?)
    }

    /// Writes the binary form into a new buffer.
    pub fn to_bytes(&self, context: &EncodingContext, metadata: &DataSetMetaData) -> Result<Bytes> {
        let mut buffer = BytesMut::new();
        let mut writer = BinaryWriter::new(&mut buffer, context);
        self.encode_with(&mut writer, metadata)?;
        Ok(buffer.freeze())
    }

    /// Reads a binary dataset whose fields are named by `metadata`.
    pub fn decode_with(
        reader: &mut BinaryReader<'_>,
        metadata: &DataSetMetaData,
        content_mask: DataSetFieldContentMask,
    ) -> Result<Self> {
        let schema = SchemaDeriver::new(metadata, content_mask).derive()?;
        let payload = AvroDatum::new(&schema).read(reader)?;
        let mut json = JsonReader::single(reader.context(), payload.clone());
        Self::decode_json_with(&payload, &mut json, metadata, content_mask)
    }

    /// Writes the dataset as a JSON tree in the mode its content mask selects.
    pub fn to_json(&self, context: &EncodingContext, metadata: &DataSetMetaData) -> Result<Value> {
        let mut writer = JsonWriter::new(context, self.content_mask.field_encoding().json_mode());
        self.encode_json_with(&mut writer, None, metadata)?;
        writer.finish()
    }

    /// Writes the fields `metadata` names, in its order, as an object or as
    /// the bare value of a single degraded field. Fields without a value are
    /// left out.
    pub fn encode_json_with(
        &self,
        writer: &mut JsonWriter<'_>,
        field: Option<&str>,
        metadata: &DataSetMetaData,
    ) -> Result<()> {
        if let Some((name, _)) = self
            .fields
            .iter()
            .find(|(name, _)| !metadata.fields.iter().any(|f| &f.name == name))
        {
            return Err(EncoderError::Encoding(format!(
                "DataSet field {} is not in the metadata",
                name
            )));
        }
        if is_bare_value(metadata, self.content_mask) {
            return self.encode_field(writer, metadata, &metadata.fields[0], field);
        }
        writer.push_object(field)?;
        for meta in &metadata.fields {
            self.encode_field(writer, metadata, meta, Some(&meta.name))?;
        }
        writer.pop_object()
    }

    fn encode_field(
        &self,
        writer: &mut JsonWriter<'_>,
        metadata: &DataSetMetaData,
        meta: &FieldMetaData,
        name: Option<&str>,
    ) -> Result<()> {
        let carrier = Carrier::of(metadata, meta);
        let Some(value) = self.get(&meta.name) else {
            return writer.write_null(name);
        };
        if self.content_mask.field_encoding() != FieldEncoding::DataValue {
            return carrier.encode(writer, meta, &value.value, name);
        }
        let value = self.content_mask.apply(value);
        if value == DataValue::default() {
            return writer.write_null(name);
        }
        writer.push_object(name)?;
        carrier.encode(writer, meta, &value.value, Some("Value"))?;
        encode_data_value_members(writer, &value)?;
        writer.pop_object()
    }

    /// Reads one dataset from a JSON token. Fields missing from the token
    /// are null.
    pub fn decode_json_with(
        token: &Value,
        reader: &mut JsonReader<'_>,
        metadata: &DataSetMetaData,
        content_mask: DataSetFieldContentMask,
    ) -> Result<Self> {
        let mut fields = Vec::with_capacity(metadata.fields.len());
        if is_bare_value(metadata, content_mask) {
            let meta = &metadata.fields[0];
            let value = decode_field(token, reader, metadata, meta, content_mask)?;
            fields.push((meta.name.clone(), value));
        } else {
            let Value::Object(_) = token else {
                return Err(EncoderError::Decoding(format!(
                    "Expected DataSet object, got {}",
                    token
                )));
            };
            let null = Value::Null;
            for meta in &metadata.fields {
                let value = reader.try_get_field(token, &meta.name).unwrap_or(&null);
                let value = decode_field(value, reader, metadata, meta, content_mask)?;
                fields.push((meta.name.clone(), value));
            }
        }
        Ok(Self {
            content_mask,
            fields,
        })
    }

    /// Reads every dataset of a JSON stream: a top-level array of datasets
    /// or a single dataset.
    pub fn decode_json_stream(
        reader: &mut JsonReader<'_>,
        metadata: &DataSetMetaData,
        content_mask: DataSetFieldContentMask,
    ) -> Result<Vec<Self>> {
        let mut datasets = Vec::new();
        while let Some(token) = reader.next_value() {
            datasets.push(Self::decode_json_with(&token, reader, metadata, content_mask)?);
        }
        Ok(datasets)
    }
}

fn is_bare_value(metadata: &DataSetMetaData, content_mask: DataSetFieldContentMask) -> bool {
    content_mask.degrades_single_field() && metadata.fields.len() == 1
}

fn decode_field(
    token: &Value,
    reader: &mut JsonReader<'_>,
    metadata: &DataSetMetaData,
    meta: &FieldMetaData,
    content_mask: DataSetFieldContentMask,
) -> Result<DataValue> {
    let carrier = Carrier::of(metadata, meta);
    if content_mask.field_encoding() != FieldEncoding::DataValue {
        return carrier.decode(token, reader).map(DataValue::new);
    }
    let Value::Object(_) = token else {
        return carrier.decode(token, reader).map(DataValue::new);
    };
    let null = Value::Null;
    let member = |name: &str| reader.try_get_field(token, name).unwrap_or(&null);
    let (value, status, source, source_ps, server, server_ps) = (
        member("Value"),
        member("StatusCode"),
        member("SourceTimestamp"),
        member("SourcePicoseconds"),
        member("ServerTimestamp"),
        member("ServerPicoseconds"),
    );
    Ok(DataValue {
        value: carrier.decode(value, reader)?,
        status: StatusCode::decode_json(status, reader)?,
        source_timestamp: DateTime::decode_json(source, reader)?,
        source_picoseconds: u16::decode_json(source_ps, reader)?,
        server_timestamp: DateTime::decode_json(server, reader)?,
        server_picoseconds: u16::decode_json(server_ps, reader)?,
    })
}
