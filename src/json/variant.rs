use super::{unexpected, JsonReader, JsonWriter};
use crate::builtin::BuiltInType;
use crate::composite::{DataValue, DiagnosticInfo, LocalizedText, QualifiedName, XmlElement};
use crate::date_time::DateTime;
use crate::extension::ExtensionObject;
use crate::node_id::{ExpandedNodeId, NodeId};
use crate::status_code::StatusCode;
use crate::variant::{Array, Matrix, Variant};
use crate::{EncoderError, JsonDecoder, JsonEncoder, Result};
use bytes::Bytes;
use serde_json::Value;
use uuid::Uuid;

// Reversible variants are `{"Type": <built-in id>, "Body": <value>}`; the
// non-reversible form is the body alone. Arrays are JSON arrays and matrices
// nested JSON arrays, outermost dimension first.

impl JsonEncoder for Variant {
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()> {
        if self.is_null() {
            return writer.write_null(field);
        }
        writer.with_nesting(|w| {
            if !w.is_reversible() {
                return encode_body(w, self, field);
            }
            w.push_object(field)?;
            w.write_value(Some("Type"), Value::from(self.built_in_type().id()))?;
            encode_body(w, self, Some("Body"))?;
            w.pop_object()
        })
    }
}

/// Writes the body of a variant without the reversible `{Type, Body}`
/// wrapper, for readers that know the type from elsewhere.
pub(crate) fn encode_variant_body(
    writer: &mut JsonWriter<'_>,
    value: &Variant,
    field: Option<&str>,
) -> Result<()> {
    if value.is_null() {
        return writer.write_null(field);
    }
    writer.with_nesting(|w| encode_body(w, value, field))
}

fn encode_body(writer: &mut JsonWriter<'_>, value: &Variant, field: Option<&str>) -> Result<()> {
    match value {
        Variant::Array(array) => {
            writer.push_array(field, array.len())?;
            for index in 0..array.len() {
                encode_element(writer, array, index)?;
            }
            writer.pop_array()
        }
        Variant::Matrix(matrix) => {
            matrix.validate()?;
            let mut offset = 0;
            encode_matrix(writer, field, &matrix.dimensions, &matrix.elements, &mut offset)
        }
        scalar => encode_scalar(writer, scalar, field),
    }
}

fn encode_matrix(
    writer: &mut JsonWriter<'_>,
    field: Option<&str>,
    dimensions: &[u32],
    elements: &Array,
    offset: &mut usize,
) -> Result<()> {
    let Some((&length, inner)) = dimensions.split_first() else {
        return Ok(());
    };
    writer.push_array(field, length as usize)?;
    for _ in 0..length {
        if inner.is_empty() {
            encode_element(writer, elements, *offset)?;
            *offset += 1;
        } else {
            encode_matrix(writer, None, inner, elements, offset)?;
        }
    }
    writer.pop_array()
}

fn element<T>(values: &[T], index: usize) -> Result<&T> {
    values.get(index).ok_or_else(|| {
        EncoderError::Encoding(format!(
            "Array index {} out of range for length {}",
            index,
            values.len()
        ))
    })
}

fn unknown_type(built_in_type: BuiltInType) -> EncoderError {
    EncoderError::Decoding(format!(
        "Cannot decode unknown type in Variant: {}",
        built_in_type
    ))
}

/// Enumerations are numbers when reversible and text otherwise.
fn encode_enumeration(writer: &mut JsonWriter<'_>, value: i32, field: Option<&str>) -> Result<()> {
    if writer.is_reversible() {
        return writer.write_value(field, Value::from(value));
    }
    writer.write_value(field, Value::String(value.to_string()))
}

/// Reads an enumeration from a number or the `Name_Value` text form.
fn decode_enumeration(token: &Value, reader: &mut JsonReader<'_>) -> Result<i32> {
    match token {
        Value::String(text) => {
            let number = text.rsplit('_').next().unwrap_or(text);
            number
                .parse::<i32>()
                .map_err(|_| unexpected("Enumeration", token))
        }
        other => i32::decode_json(other, reader),
    }
}

macro_rules! variant_json {
    ($($kind:ident($ty:ty)),* $(,)?) => {
        fn encode_scalar(writer: &mut JsonWriter<'_>, value: &Variant, field: Option<&str>) -> Result<()> {
            match value {
                $(Variant::$kind(v) => v.encode_json(writer, field),)*
                Variant::DataValue(v) => v.encode_json(writer, field),
                Variant::DiagnosticInfo(v) => v.encode_json(writer, field),
                Variant::Enumeration(v) => encode_enumeration(writer, *v, field),
                Variant::Null | Variant::Array(_) | Variant::Matrix(_) => writer.write_null(field),
            }
        }

        fn encode_element(writer: &mut JsonWriter<'_>, array: &Array, index: usize) -> Result<()> {
            match array {
                $(Array::$kind(values) => element(values, index)?.encode_json(writer, None),)*
                Array::DataValue(values) => element(values, index)?.encode_json(writer, None),
                Array::DiagnosticInfo(values) => element(values, index)?.encode_json(writer, None),
                Array::Variant(values) => element(values, index)?.encode_json(writer, None),
                Array::Enumeration(values) => encode_enumeration(writer, *element(values, index)?, None),
            }
        }

        fn decode_scalar(
            built_in_type: BuiltInType,
            token: &Value,
            reader: &mut JsonReader<'_>,
        ) -> Result<Variant> {
            Ok(match built_in_type {
                BuiltInType::Null => Variant::Null,
                $(BuiltInType::$kind => Variant::$kind(<$ty>::decode_json(token, reader)?),)*
                BuiltInType::DataValue => {
                    Variant::DataValue(Box::new(DataValue::decode_json(token, reader)?))
                }
                BuiltInType::DiagnosticInfo => {
                    Variant::DiagnosticInfo(Box::new(DiagnosticInfo::decode_json(token, reader)?))
                }
                BuiltInType::Enumeration => Variant::Enumeration(decode_enumeration(token, reader)?),
                other => return Err(unknown_type(other)),
            })
        }

        fn decode_elements(
            built_in_type: BuiltInType,
            tokens: &[&Value],
            reader: &mut JsonReader<'_>,
        ) -> Result<Array> {
            reader.check_array_length(tokens.len())?;
            Ok(match built_in_type {
                $(BuiltInType::$kind => Array::$kind(
                    tokens
                        .iter()
                        .map(|token| <$ty>::decode_json(token, reader))
                        .collect::<Result<Vec<_>>>()?,
                ),)*
                BuiltInType::DataValue => Array::DataValue(
                    tokens
                        .iter()
                        .map(|token| DataValue::decode_json(token, reader))
                        .collect::<Result<Vec<_>>>()?,
                ),
                BuiltInType::DiagnosticInfo => Array::DiagnosticInfo(
                    tokens
                        .iter()
                        .map(|token| DiagnosticInfo::decode_json(token, reader))
                        .collect::<Result<Vec<_>>>()?,
                ),
                BuiltInType::Variant => Array::Variant(
                    tokens
                        .iter()
                        .map(|token| Variant::decode_json(token, reader))
                        .collect::<Result<Vec<_>>>()?,
                ),
                BuiltInType::Enumeration => Array::Enumeration(
                    tokens
                        .iter()
                        .map(|token| decode_enumeration(token, reader))
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => return Err(unknown_type(other)),
            })
        }
    };
}

variant_json! {
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(DateTime),
    Guid(Uuid),
    ByteString(Bytes),
    XmlElement(XmlElement),
    NodeId(NodeId),
    ExpandedNodeId(ExpandedNodeId),
    StatusCode(StatusCode),
    QualifiedName(QualifiedName),
    LocalizedText(LocalizedText),
    ExtensionObject(ExtensionObject),
}

/// The dimensions of a nested array, following the first element at each level.
fn discover_dimensions(token: &Value) -> Vec<u32> {
    let mut dimensions = Vec::new();
    let mut current = token;
    while let Value::Array(items) = current {
        dimensions.push(items.len() as u32);
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    dimensions
}

/// Collects the leaves of a nested array, checking every level against
/// `dimensions`. Each level counts against the nesting limit.
fn flatten<'v>(
    token: &'v Value,
    dimensions: &[u32],
    out: &mut Vec<&'v Value>,
    reader: &mut JsonReader<'_>,
) -> Result<()> {
    let Some((&length, inner)) = dimensions.split_first() else {
        out.push(token);
        return Ok(());
    };
    let Value::Array(items) = token else {
        return Err(EncoderError::Decoding(
            "Read matrix is smaller than array dimensions.".to_string(),
        ));
    };
    if items.len() > length as usize {
        return Err(EncoderError::Decoding(
            "Read matrix is larger than array dimensions.".to_string(),
        ));
    }
    if items.len() < length as usize {
        return Err(EncoderError::Decoding(
            "Read matrix is smaller than array dimensions.".to_string(),
        ));
    }
    reader.with_nesting(|r| items.iter().try_for_each(|item| flatten(item, inner, out, r)))
}

/// Decodes a JSON array of a known element type as an array or matrix.
fn decode_typed_array(
    built_in_type: BuiltInType,
    token: &Value,
    reader: &mut JsonReader<'_>,
) -> Result<Variant> {
    // Arrays of variants nest objects, never arrays, so only the first level counts.
    let dimensions = if built_in_type == BuiltInType::Variant {
        vec![token.as_array().map_or(0, Vec::len) as u32]
    } else {
        discover_dimensions(token)
    };
    if let Some(count) = Matrix::element_count(&dimensions) {
        reader.check_array_length(count)?;
    }
    let mut leaves = Vec::new();
    flatten(token, &dimensions, &mut leaves, reader)?;
    let elements = decode_elements(built_in_type, &leaves, reader)?;
    if dimensions.len() < 2 {
        return Ok(Variant::Array(elements));
    }
    Ok(Variant::Matrix(Matrix {
        dimensions,
        elements,
    }))
}

/// Infers a variant from a bare token.
fn infer(token: &Value, reader: &mut JsonReader<'_>) -> Result<Variant> {
    Ok(match token {
        Value::Null => Variant::Null,
        Value::Bool(value) => Variant::Boolean(*value),
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Variant::Int64(value)
            } else if let Some(value) = number.as_u64() {
                Variant::UInt64(value)
            } else {
                Variant::Double(number.as_f64().unwrap_or_default())
            }
        }
        Value::String(text) => {
            reader.check_string_length(text.len())?;
            Variant::String(text.clone())
        }
        Value::Array(items) => {
            reader.check_array_length(items.len())?;
            return reader.with_nesting(|r| infer_array(token, items, r));
        }
        Value::Object(_) => Variant::ExtensionObject(ExtensionObject::decode_json(token, reader)?),
    })
}

fn infer_array(token: &Value, items: &[Value], reader: &mut JsonReader<'_>) -> Result<Variant> {
    let dimensions = discover_dimensions(token);
    if dimensions.len() >= 2 && dimensions.iter().all(|&d| d > 0) {
        let mut leaves = Vec::new();
        flatten(token, &dimensions, &mut leaves, reader)?;
        let elements = leaves
            .into_iter()
            .map(|leaf| infer(leaf, reader))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Variant::Matrix(Matrix {
            dimensions,
            elements: homogeneous(elements),
        }));
    }
    let elements = items
        .iter()
        .map(|item| infer(item, reader))
        .collect::<Result<Vec<_>>>()?;
    Ok(Variant::Array(homogeneous(elements)))
}

fn homogeneous(elements: Vec<Variant>) -> Array {
    if elements.is_empty() {
        return Array::Variant(elements);
    }
    let first = elements[0].scalar_type();
    let uniform = first.is_some_and(|t| t != BuiltInType::Null)
        && elements.iter().all(|e| e.scalar_type() == first);
    if uniform {
        if let Some(array) = Array::from_scalars(elements.clone()) {
            return array;
        }
    }
    Array::Variant(elements)
}

impl JsonDecoder for Variant {
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self> {
        if token.is_null() {
            return Ok(Variant::Null);
        }
        reader.with_nesting(|r| {
            let Some(type_token) = token.get("Type") else {
                return infer(token, r);
            };
            let type_id = type_token
                .as_u64()
                .and_then(|id| u32::try_from(id).ok())
                .and_then(BuiltInType::from_id)
                .ok_or_else(|| {
                    EncoderError::Decoding(format!("Unknown variant type {}", type_token))
                })?;
            let null = Value::Null;
            let body = r.try_get_field(token, "Body").unwrap_or(&null);
            match body {
                Value::Array(_) => decode_typed_array(type_id, body, r),
                _ => decode_scalar(type_id, body, r),
            }
        })
    }
}
