//! # opcua-encoder
//!
//! Codecs for the OPC UA built-in type system.
//!
//! - Avro-style binary encoding (zig-zag varints, length-prefixed strings, union indexes)
//! - OPC UA JSON encoding in reversible and non-reversible form
//! - A closed [`Variant`] sum type with scalars, arrays and matrices
//! - Extension objects resolved through a pluggable [`TypeCatalog`]
//! - Avro schema derivation for dataset payloads, consistent with the codecs
//!
//! ## Wire forms
//!
//! Binary values are written with a [`BinaryWriter`] and read with a [`BinaryReader`].
//! JSON values are built with a push-style [`JsonWriter`] into a `serde_json::Value`
//! tree and read back through a [`JsonReader`].
//! Both are bound to an [`EncodingContext`] that carries the encoding limits, the
//! namespace and server URI tables and the type catalog.
//!
//! ## Example
//! ```rust
//! use opcua_encoder::{decode, encode, EncodingContext, Variant};
//!
//! let context = EncodingContext::default();
//! let value = Variant::from(42i32);
//! let mut buf = encode(&value, &context).unwrap();
//! let decoded: Variant = decode(&mut buf, &context).unwrap();
//! assert_eq!(value, decoded);
//! ```

pub mod binary;
pub mod builtin;
pub mod composite;
pub mod context;
pub mod dataset;
pub mod date_time;
pub mod discriminator;
pub mod extension;
pub mod json;
pub mod metadata;
pub mod node_id;
pub mod schema;
pub mod status_code;
pub mod variant;

pub use binary::{BinaryReader, BinaryWriter};
pub use builtin::{BuiltInType, ValueRank};
pub use composite::{DataValue, DiagnosticInfo, LocalizedText, QualifiedName, XmlElement};
pub use context::{EncodingContext, EncodingLimits, UriTable};
pub use dataset::{DataSet, DataSetFieldContentMask, FieldEncoding};
pub use date_time::DateTime;
pub use extension::{
    BodyEncoding, EncodedBody, Encodeable, EncodeableFactory, ExtensionBody, ExtensionObject,
    TypeCatalog, TypeRegistry,
};
pub use json::{JsonEncodingMode, JsonReader, JsonWriter};
pub use metadata::{DataSetMetaData, FieldMetaData};
pub use node_id::{ExpandedNodeId, Identifier, NodeId};
pub use schema::{Schema, SchemaDeriver};
pub use status_code::StatusCode;
pub use variant::{Array, Matrix, Variant};

use bytes::{Bytes, BytesMut};
use serde_json::Value;

/// Errors that can occur during encoding, decoding or schema derivation.
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// The value is internally inconsistent and cannot be written (e.g. a matrix whose
    /// dimensions do not match its element count, or a type that has no discriminator).
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// The input is malformed (e.g. unknown union index, bad guid text, dimension mismatch).
    #[error("Decoding error: {0}")]
    Decoding(String),
    /// A configured array, string, nesting or depth bound was violated.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// No schema could be derived for a declared type.
    #[error("Schema error: {0}")]
    Schema(String),
    /// The buffer did not contain enough data to complete the operation.
    #[error("Insufficient data in buffer")]
    InsufficientData,
    /// The JSON text could not be parsed or produced.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The four error kinds callers distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Encoding,
    Decoding,
    LimitExceeded,
    Schema,
}

impl EncoderError {
    /// Folds the error into one of the four kinds.
    ///
    /// Truncated input and malformed JSON text are decoding errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncoderError::Encoding(_) => ErrorKind::Encoding,
            EncoderError::Decoding(_) | EncoderError::InsufficientData | EncoderError::Json(_) => {
                ErrorKind::Decoding
            }
            EncoderError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            EncoderError::Schema(_) => ErrorKind::Schema,
        }
    }
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, EncoderError>;

/// Trait for types that can be written in the binary form.
///
/// # Errors
/// Returns `EncoderError` if the value cannot be encoded or a limit is exceeded.
pub trait Encoder {
    /// Encode the value into the writer's buffer.
    ///
    /// # Arguments
    /// * `writer` - The binary writer bound to an encoding context.
    fn encode(&self, writer: &mut BinaryWriter<'_>) -> Result<()>;
}

/// Trait for types that can be read from the binary form.
///
/// # Errors
/// Returns `EncoderError` if the data is invalid, truncated or exceeds a limit.
pub trait Decoder: Sized {
    /// Decode the value from the reader's buffer.
    ///
    /// # Arguments
    /// * `reader` - The binary reader bound to an encoding context.
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self>;
}

/// Trait for types that can be written in the JSON form.
pub trait JsonEncoder {
    /// Write the value, either as the named field of the current object
    /// (`field` is `Some`) or as the next array element / root value.
    fn encode_json(&self, writer: &mut JsonWriter<'_>, field: Option<&str>) -> Result<()>;
}

/// Trait for types that can be read from the JSON form.
pub trait JsonDecoder: Sized {
    /// Decode the value from a token of the JSON tree. `Value::Null` stands for
    /// an absent field.
    fn decode_json(token: &Value, reader: &mut JsonReader<'_>) -> Result<Self>;
}

/// Convenience function to encode a value to bytes.
///
/// # Example
/// ```rust
/// use opcua_encoder::{encode, EncodingContext, Variant};
///
/// let bytes = encode(&Variant::Boolean(true), &EncodingContext::default()).unwrap();
/// assert_eq!(&bytes[..], &[0x00, 0x02, 0x01]);
/// ```
pub fn encode<T: Encoder>(value: &T, context: &EncodingContext) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    let mut writer = BinaryWriter::new(&mut buffer, context);
    value.encode(&mut writer)?;
    Ok(buffer.freeze())
}

/// Convenience function to decode a value from bytes.
///
/// The reader is advanced past the decoded value.
pub fn decode<T: Decoder>(reader: &mut Bytes, context: &EncodingContext) -> Result<T> {
    let mut binary = BinaryReader::new(reader.clone(), context);
    let value = T::decode(&mut binary)?;
    *reader = binary.into_remaining();
    Ok(value)
}

/// Convenience function to encode a value into a JSON token tree.
///
/// # Example
/// ```rust
/// use opcua_encoder::{encode_json, EncodingContext, JsonEncodingMode, Variant};
///
/// let json = encode_json(&Variant::Int64(7), &EncodingContext::default(),
///     JsonEncodingMode::default()).unwrap();
/// assert_eq!(json, serde_json::json!({ "Type": 8, "Body": "7" }));
/// ```
pub fn encode_json<T: JsonEncoder>(
    value: &T,
    context: &EncodingContext,
    mode: JsonEncodingMode,
) -> Result<Value> {
    let mut writer = JsonWriter::new(context, mode);
    value.encode_json(&mut writer, None)?;
    writer.finish()
}

/// Convenience function to decode a value from a JSON token tree.
pub fn decode_json<T: JsonDecoder>(value: &Value, context: &EncodingContext) -> Result<T> {
    let mut reader = JsonReader::single(context, value.clone());
    T::decode_json(value, &mut reader)
}
