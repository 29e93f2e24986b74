use super::{BinaryReader, BinaryWriter};
use crate::builtin::{BuiltInType, ValueRank};
use crate::composite::{DataValue, DiagnosticInfo, LocalizedText, QualifiedName, XmlElement};
use crate::date_time::DateTime;
use crate::discriminator::{self, NULL_INDEX};
use crate::extension::ExtensionObject;
use crate::node_id::{ExpandedNodeId, NodeId};
use crate::status_code::StatusCode;
use crate::variant::{Array, Matrix, Variant};
use crate::{Decoder, Encoder, EncoderError, Result};
use bytes::Bytes;
use uuid::Uuid;

// A variant is written as: dimensions (an int array, empty unless the value
// is a matrix), the discriminator index, then the body.

impl Encoder for Variant {
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()> {
        writer.with_nesting(|w| encode_variant(w, self))
    }
}

impl Decoder for Variant {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self> {
        reader.with_nesting(decode_variant)
    }
}

fn encode_variant(writer: &mut BinaryWriter<'_>, value: &Variant) -> Result<()> {
    match value {
        Variant::Matrix(matrix) => {
            matrix.validate()?;
            let index =
                discriminator::encode_index(ValueRank::OneDimension, matrix.elements.built_in_type())?;
            write_dimensions(writer, &matrix.dimensions)?;
            writer.write_union_index(index);
            encode_array(writer, &matrix.elements)
        }
        Variant::Array(array) => {
            let index = discriminator::encode_index(ValueRank::OneDimension, array.built_in_type())?;
            write_dimensions(writer, &[])?;
            writer.write_union_index(index);
            encode_array(writer, array)
        }
        // Good is the absence of a status: the null marker stands for it.
        Variant::Null | Variant::StatusCode(StatusCode::GOOD) => {
            write_dimensions(writer, &[])?;
            writer.write_union_index(NULL_INDEX);
            Ok(())
        }
        scalar => {
            let index = discriminator::encode_index(ValueRank::Scalar, scalar.built_in_type())?;
            write_dimensions(writer, &[])?;
            writer.write_union_index(index);
            encode_scalar(writer, scalar)
        }
    }
}

fn decode_variant(reader: &mut BinaryReader<'_>) -> Result<Variant> {
    let dimensions = read_dimensions(reader)?;
    let (rank, built_in_type) = discriminator::decode_index(reader.read_union_index()?)?;
    // The writer leaves dimensions empty for scalars and arrays.
    match (rank, dimensions.len()) {
        (ValueRank::Scalar, 0) | (ValueRank::OneDimension, 0) => {}
        (ValueRank::OneDimension, length) if length >= 2 => {}
        (_, length) => {
            return Err(EncoderError::Decoding(format!(
                "Unexpected {} array dimensions for a {:?} variant",
                length, rank
            )))
        }
    }
    match rank {
        ValueRank::Scalar => decode_scalar(reader, built_in_type),
        ValueRank::OneDimension => {
            let elements = decode_array(reader, built_in_type)?;
            if dimensions.is_empty() {
                return Ok(Variant::Array(elements));
            }
            if Matrix::element_count(&dimensions) != Some(elements.len()) {
                return Err(EncoderError::Decoding(format!(
                    "ArrayDimensions does not match with the ArrayLength: {:?} vs {}",
                    dimensions,
                    elements.len()
                )));
            }
            Ok(Variant::Matrix(Matrix {
                dimensions,
                elements,
            }))
        }
    }
}

fn write_dimensions(writer: &mut BinaryWriter<'_>, dimensions: &[u32]) -> Result<()> {
    writer.write_array_length(dimensions.len())?;
    for &dimension in dimensions {
        let dimension = i32::try_from(dimension).map_err(|_| {
            EncoderError::Encoding(format!("Array dimension {} out of range", dimension))
        })?;
        writer.write_int(dimension);
    }
    Ok(())
}

fn read_dimensions(reader: &mut BinaryReader<'_>) -> Result<Vec<u32>> {
    let count = reader.read_array_length()?;
    let mut dimensions = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let dimension = reader.read_int()?;
        let dimension = u32::try_from(dimension).map_err(|_| {
            EncoderError::Decoding(format!("Negative array dimension {}", dimension))
        })?;
        dimensions.push(dimension);
    }
    Ok(dimensions)
}

fn encode_scalar(writer: &mut BinaryWriter<'_>, value: &Variant) -> Result<()> {
    match value {
        Variant::Boolean(v) => v.encode(writer),
        Variant::SByte(v) => v.encode(writer),
        Variant::Byte(v) => v.encode(writer),
        Variant::Int16(v) => v.encode(writer),
        Variant::UInt16(v) => v.encode(writer),
        Variant::Int32(v) => v.encode(writer),
        Variant::UInt32(v) => v.encode(writer),
        Variant::Int64(v) => v.encode(writer),
        Variant::UInt64(v) => v.encode(writer),
        Variant::Float(v) => v.encode(writer),
        Variant::Double(v) => v.encode(writer),
        Variant::String(v) => v.encode(writer),
        Variant::DateTime(v) => v.encode(writer),
        Variant::Guid(v) => v.encode(writer),
        Variant::ByteString(v) => v.encode(writer),
        Variant::XmlElement(v) => v.encode(writer),
        Variant::NodeId(v) => v.encode(writer),
        Variant::ExpandedNodeId(v) => v.encode(writer),
        Variant::StatusCode(v) => v.encode(writer),
        Variant::QualifiedName(v) => v.encode(writer),
        Variant::LocalizedText(v) => v.encode(writer),
        Variant::ExtensionObject(v) => v.encode(writer),
        Variant::DataValue(v) => v.encode(writer),
        Variant::DiagnosticInfo(v) => v.encode(writer),
        Variant::Enumeration(v) => v.encode(writer),
        Variant::Null | Variant::Array(_) | Variant::Matrix(_) => Ok(()),
    }
}

fn decode_scalar(reader: &mut BinaryReader<'_>, built_in_type: BuiltInType) -> Result<Variant> {
    Ok(match built_in_type {
        BuiltInType::Null => Variant::Null,
        BuiltInType::Boolean => Variant::Boolean(bool::decode(reader)?),
        BuiltInType::SByte => Variant::SByte(i8::decode(reader)?),
        BuiltInType::Byte => Variant::Byte(u8::decode(reader)?),
        BuiltInType::Int16 => Variant::Int16(i16::decode(reader)?),
        BuiltInType::UInt16 => Variant::UInt16(u16::decode(reader)?),
        BuiltInType::Int32 => Variant::Int32(i32::decode(reader)?),
        BuiltInType::UInt32 => Variant::UInt32(u32::decode(reader)?),
        BuiltInType::Int64 => Variant::Int64(i64::decode(reader)?),
        BuiltInType::UInt64 => Variant::UInt64(u64::decode(reader)?),
        BuiltInType::Float => Variant::Float(f32::decode(reader)?),
        BuiltInType::Double => Variant::Double(f64::decode(reader)?),
        BuiltInType::String => Variant::String(String::decode(reader)?),
        BuiltInType::DateTime => Variant::DateTime(DateTime::decode(reader)?),
        BuiltInType::Guid => Variant::Guid(Uuid::decode(reader)?),
        BuiltInType::ByteString => Variant::ByteString(Bytes::decode(reader)?),
        BuiltInType::XmlElement => Variant::XmlElement(XmlElement::decode(reader)?),
        BuiltInType::NodeId => Variant::NodeId(NodeId::decode(reader)?),
        BuiltInType::ExpandedNodeId => Variant::ExpandedNodeId(ExpandedNodeId::decode(reader)?),
        BuiltInType::StatusCode => Variant::StatusCode(StatusCode::decode(reader)?),
        BuiltInType::QualifiedName => Variant::QualifiedName(QualifiedName::decode(reader)?),
        BuiltInType::LocalizedText => Variant::LocalizedText(LocalizedText::decode(reader)?),
        BuiltInType::ExtensionObject => {
            Variant::ExtensionObject(ExtensionObject::decode(reader)?)
        }
        BuiltInType::DataValue => Variant::DataValue(Box::new(DataValue::decode(reader)?)),
        BuiltInType::DiagnosticInfo => {
            Variant::DiagnosticInfo(Box::new(DiagnosticInfo::decode(reader)?))
        }
        BuiltInType::Enumeration => Variant::Enumeration(i32::decode(reader)?),
        other => return Err(unknown_type(other)),
    })
}

fn unknown_type(built_in_type: BuiltInType) -> EncoderError {
    EncoderError::Decoding(format!(
        "Cannot decode unknown type in Variant: {}",
        built_in_type
    ))
}

// --- arrays ---
// Reference-type elements travel as a nullable union: 0 null, 1 value.

fn write_elements<T: Encoder>(writer: &mut BinaryWriter<'_>, values: &[T]) -> Result<()> {
    writer.write_array_length(values.len())?;
    values.iter().try_for_each(|value| value.encode(writer))
}

fn write_nullable_elements<T: Encoder>(writer: &mut BinaryWriter<'_>, values: &[T]) -> Result<()> {
    writer.write_array_length(values.len())?;
    values.iter().try_for_each(|value| {
        writer.write_union_index(1);
        value.encode(writer)
    })
}

fn read_elements<T: Decoder>(reader: &mut BinaryReader<'_>, length: usize) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(length.min(reader.remaining()));
    for _ in 0..length {
        values.push(T::decode(reader)?);
    }
    Ok(values)
}

fn read_nullable_elements<T: Decoder + Default>(
    reader: &mut BinaryReader<'_>,
    length: usize,
) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(length.min(reader.remaining()));
    for _ in 0..length {
        let value = match reader.read_union_index()? {
            0 => T::default(),
            1 => T::decode(reader)?,
            other => {
                return Err(EncoderError::Decoding(format!(
                    "Cannot decode unknown nullable union field: {}",
                    other
                )))
            }
        };
        values.push(value);
    }
    Ok(values)
}

macro_rules! array_codec {
    (plain: $($p:ident($pt:ty)),*; nullable: $($n:ident($nt:ty)),* $(;)?) => {
        pub(crate) fn encode_array(writer: &mut BinaryWriter<'_>, array: &Array) -> Result<()> {
            match array {
                $(Array::$p(values) => write_elements(writer, values),)*
                $(Array::$n(values) => write_nullable_elements(writer, values),)*
            }
        }

        pub(crate) fn decode_array(
            reader: &mut BinaryReader<'_>,
            built_in_type: BuiltInType,
        ) -> Result<Array> {
            let length = reader.read_array_length()?;
            Ok(match built_in_type {
                $(BuiltInType::$p => Array::$p(read_elements::<$pt>(reader, length)?),)*
                $(BuiltInType::$n => Array::$n(read_nullable_elements::<$nt>(reader, length)?),)*
                other => return Err(unknown_type(other)),
            })
        }
    };
}

array_codec! {
    plain:
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
        DateTime(DateTime),
        Guid(Uuid),
        NodeId(NodeId),
        ExpandedNodeId(ExpandedNodeId),
        StatusCode(StatusCode),
        Variant(Variant),
        Enumeration(i32);
    nullable:
        String(String),
        ByteString(Bytes),
        XmlElement(XmlElement),
        QualifiedName(QualifiedName),
        LocalizedText(LocalizedText),
        ExtensionObject(ExtensionObject),
        DataValue(DataValue),
        DiagnosticInfo(DiagnosticInfo);
}
