//! The tagged union value of the built-in type system.

use crate::builtin::BuiltInType;
use crate::composite::{DataValue, DiagnosticInfo, LocalizedText, QualifiedName, XmlElement};
use crate::date_time::DateTime;
use crate::extension::ExtensionObject;
use crate::node_id::{ExpandedNodeId, NodeId};
use crate::status_code::StatusCode;
use crate::{EncoderError, Result};
use bytes::Bytes;
use uuid::Uuid;

/// A scalar, a one-dimensional array or a matrix of one built-in type.
///
/// `Number`, `Integer` and `UInteger` are abstract and have no case of their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variant {
    #[default]
    Null,
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
    DataValue(Box<DataValue>),
    DiagnosticInfo(Box<DiagnosticInfo>),
    Enumeration(i32),
    Array(Array),
    Matrix(Matrix),
}

macro_rules! impl_array {
    ($($kind:ident($ty:ty) => $scalar:expr),* $(,)?) => {
        /// A one-dimensional array. Every case holds elements of one built-in type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Array {
            $($kind(Vec<$ty>),)*
        }

        impl Array {
            /// The element type.
            pub fn built_in_type(&self) -> BuiltInType {
                match self {
                    $(Array::$kind(_) => BuiltInType::$kind,)*
                }
            }

            pub fn len(&self) -> usize {
                match self {
                    $(Array::$kind(v) => v.len(),)*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// An empty array of the given element type. `Null` and the
            /// abstract types have no array form.
            pub fn empty(built_in_type: BuiltInType) -> Option<Array> {
                match built_in_type {
                    $(BuiltInType::$kind => Some(Array::$kind(Vec::new())),)*
                    _ => None,
                }
            }

            /// The element at `index` as a scalar variant.
            pub fn get(&self, index: usize) -> Option<Variant> {
                match self {
                    $(Array::$kind(v) => v.get(index).cloned().map($scalar),)*
                }
            }
        }
    };
}

impl_array! {
    Boolean(bool) => Variant::Boolean,
    SByte(i8) => Variant::SByte,
    Byte(u8) => Variant::Byte,
    Int16(i16) => Variant::Int16,
    UInt16(u16) => Variant::UInt16,
    Int32(i32) => Variant::Int32,
    UInt32(u32) => Variant::UInt32,
    Int64(i64) => Variant::Int64,
    UInt64(u64) => Variant::UInt64,
    Float(f32) => Variant::Float,
    Double(f64) => Variant::Double,
    String(String) => Variant::String,
    DateTime(DateTime) => Variant::DateTime,
    Guid(Uuid) => Variant::Guid,
    ByteString(Bytes) => Variant::ByteString,
    XmlElement(XmlElement) => Variant::XmlElement,
    NodeId(NodeId) => Variant::NodeId,
    ExpandedNodeId(ExpandedNodeId) => Variant::ExpandedNodeId,
    StatusCode(StatusCode) => Variant::StatusCode,
    QualifiedName(QualifiedName) => Variant::QualifiedName,
    LocalizedText(LocalizedText) => Variant::LocalizedText,
    ExtensionObject(ExtensionObject) => Variant::ExtensionObject,
    DataValue(DataValue) => |v| Variant::DataValue(Box::new(v)),
    Variant(Variant) => |v| v,
    DiagnosticInfo(DiagnosticInfo) => |v| Variant::DiagnosticInfo(Box::new(v)),
    Enumeration(i32) => Variant::Enumeration,
}

impl Array {
    /// Builds a typed array from scalar variants of one type. Returns `None`
    /// for an empty input, for mixed types and for non-scalar elements.
    pub fn from_scalars(values: Vec<Variant>) -> Option<Array> {
        let first = values.first()?.scalar_type()?;
        macro_rules! collect {
            ($kind:ident, $bind:ident => $value:expr) => {
                values
                    .into_iter()
                    .map(|v| match v {
                        Variant::$kind($bind) => Some($value),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .map(Array::$kind)
            };
        }
        match first {
            BuiltInType::Boolean => collect!(Boolean, x => x),
            BuiltInType::SByte => collect!(SByte, x => x),
            BuiltInType::Byte => collect!(Byte, x => x),
            BuiltInType::Int16 => collect!(Int16, x => x),
            BuiltInType::UInt16 => collect!(UInt16, x => x),
            BuiltInType::Int32 => collect!(Int32, x => x),
            BuiltInType::UInt32 => collect!(UInt32, x => x),
            BuiltInType::Int64 => collect!(Int64, x => x),
            BuiltInType::UInt64 => collect!(UInt64, x => x),
            BuiltInType::Float => collect!(Float, x => x),
            BuiltInType::Double => collect!(Double, x => x),
            BuiltInType::String => collect!(String, x => x),
            BuiltInType::DateTime => collect!(DateTime, x => x),
            BuiltInType::Guid => collect!(Guid, x => x),
            BuiltInType::ByteString => collect!(ByteString, x => x),
            BuiltInType::XmlElement => collect!(XmlElement, x => x),
            BuiltInType::NodeId => collect!(NodeId, x => x),
            BuiltInType::ExpandedNodeId => collect!(ExpandedNodeId, x => x),
            BuiltInType::StatusCode => collect!(StatusCode, x => x),
            BuiltInType::QualifiedName => collect!(QualifiedName, x => x),
            BuiltInType::LocalizedText => collect!(LocalizedText, x => x),
            BuiltInType::ExtensionObject => collect!(ExtensionObject, x => x),
            BuiltInType::DataValue => collect!(DataValue, x => *x),
            BuiltInType::DiagnosticInfo => collect!(DiagnosticInfo, x => *x),
            BuiltInType::Enumeration => collect!(Enumeration, x => x),
            _ => None,
        }
    }

    /// The elements as scalar variants.
    pub fn to_variants(&self) -> Vec<Variant> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

/// A multi-dimensional array: flat elements in row-major order plus the
/// length of every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub dimensions: Vec<u32>,
    pub elements: Array,
}

impl Matrix {
    /// Builds a matrix, checking that the dimensions describe the elements.
    pub fn new(dimensions: Vec<u32>, elements: Array) -> Result<Self> {
        let matrix = Matrix {
            dimensions,
            elements,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Product of the dimensions, `None` on overflow.
    pub fn element_count(dimensions: &[u32]) -> Option<usize> {
        dimensions
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions.len() < 2 {
            return Err(EncoderError::Encoding(format!(
                "A matrix needs at least 2 dimensions, got {}",
                self.dimensions.len()
            )));
        }
        if Self::element_count(&self.dimensions) != Some(self.elements.len()) {
            return Err(EncoderError::Encoding(format!(
                "ArrayDimensions {:?} do not match the array length {}",
                self.dimensions,
                self.elements.len()
            )));
        }
        Ok(())
    }
}

impl Variant {
    /// The built-in type of the value, or of the elements of an array or matrix.
    pub fn built_in_type(&self) -> BuiltInType {
        match self {
            Variant::Array(array) => array.built_in_type(),
            Variant::Matrix(matrix) => matrix.elements.built_in_type(),
            other => other.scalar_type().unwrap_or(BuiltInType::Null),
        }
    }

    /// The type of a scalar value; `None` for arrays and matrices.
    pub fn scalar_type(&self) -> Option<BuiltInType> {
        Some(match self {
            Variant::Null => BuiltInType::Null,
            Variant::Boolean(_) => BuiltInType::Boolean,
            Variant::SByte(_) => BuiltInType::SByte,
            Variant::Byte(_) => BuiltInType::Byte,
            Variant::Int16(_) => BuiltInType::Int16,
            Variant::UInt16(_) => BuiltInType::UInt16,
            Variant::Int32(_) => BuiltInType::Int32,
            Variant::UInt32(_) => BuiltInType::UInt32,
            Variant::Int64(_) => BuiltInType::Int64,
            Variant::UInt64(_) => BuiltInType::UInt64,
            Variant::Float(_) => BuiltInType::Float,
            Variant::Double(_) => BuiltInType::Double,
            Variant::String(_) => BuiltInType::String,
            Variant::DateTime(_) => BuiltInType::DateTime,
            Variant::Guid(_) => BuiltInType::Guid,
            Variant::ByteString(_) => BuiltInType::ByteString,
            Variant::XmlElement(_) => BuiltInType::XmlElement,
            Variant::NodeId(_) => BuiltInType::NodeId,
            Variant::ExpandedNodeId(_) => BuiltInType::ExpandedNodeId,
            Variant::StatusCode(_) => BuiltInType::StatusCode,
            Variant::QualifiedName(_) => BuiltInType::QualifiedName,
            Variant::LocalizedText(_) => BuiltInType::LocalizedText,
            Variant::ExtensionObject(_) => BuiltInType::ExtensionObject,
            Variant::DataValue(_) => BuiltInType::DataValue,
            Variant::DiagnosticInfo(_) => BuiltInType::DiagnosticInfo,
            Variant::Enumeration(_) => BuiltInType::Enumeration,
            Variant::Array(_) | Variant::Matrix(_) => return None,
        })
    }

    /// -1 for scalars, 1 for arrays, the number of dimensions for matrices.
    pub fn value_rank(&self) -> i32 {
        match self {
            Variant::Array(_) => 1,
            Variant::Matrix(matrix) => matrix.dimensions.len() as i32,
            _ => -1,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Variant::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(_) | Variant::Matrix(_))
    }
}

macro_rules! impl_from {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Variant::$kind(value)
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime => DateTime,
    Uuid => Guid,
    Bytes => ByteString,
    XmlElement => XmlElement,
    NodeId => NodeId,
    ExpandedNodeId => ExpandedNodeId,
    StatusCode => StatusCode,
    QualifiedName => QualifiedName,
    LocalizedText => LocalizedText,
    ExtensionObject => ExtensionObject,
    Array => Array,
    Matrix => Matrix,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<DataValue> for Variant {
    fn from(value: DataValue) -> Self {
        Variant::DataValue(Box::new(value))
    }
}

impl From<DiagnosticInfo> for Variant {
    fn from(value: DiagnosticInfo) -> Self {
        Variant::DiagnosticInfo(Box::new(value))
    }
}

macro_rules! impl_array_from {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Array {
                fn from(value: Vec<$ty>) -> Self {
                    Array::$kind(value)
                }
            }

            impl From<Vec<$ty>> for Variant {
                fn from(value: Vec<$ty>) -> Self {
                    Variant::Array(Array::$kind(value))
                }
            }
        )*
    };
}

impl_array_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime => DateTime,
    Uuid => Guid,
    Bytes => ByteString,
    XmlElement => XmlElement,
    NodeId => NodeId,
    ExpandedNodeId => ExpandedNodeId,
    StatusCode => StatusCode,
    QualifiedName => QualifiedName,
    LocalizedText => LocalizedText,
    ExtensionObject => ExtensionObject,
    DataValue => DataValue,
    Variant => Variant,
    DiagnosticInfo => DiagnosticInfo,
}
