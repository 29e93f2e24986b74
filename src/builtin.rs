use std::fmt;

/// The OPC UA built-in type ids.
///
/// The numeric value is the id used on the wire (JSON `Type` field, schema aliases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BuiltInType {
    Null = 0,
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    Guid = 14,
    ByteString = 15,
    XmlElement = 16,
    NodeId = 17,
    ExpandedNodeId = 18,
    StatusCode = 19,
    QualifiedName = 20,
    LocalizedText = 21,
    ExtensionObject = 22,
    DataValue = 23,
    Variant = 24,
    DiagnosticInfo = 25,
    Number = 26,
    Integer = 27,
    UInteger = 28,
    Enumeration = 29,
}

impl BuiltInType {
    /// All built-in types in id order.
    pub const ALL: [BuiltInType; 30] = [
        BuiltInType::Null,
        BuiltInType::Boolean,
        BuiltInType::SByte,
        BuiltInType::Byte,
        BuiltInType::Int16,
        BuiltInType::UInt16,
        BuiltInType::Int32,
        BuiltInType::UInt32,
        BuiltInType::Int64,
        BuiltInType::UInt64,
        BuiltInType::Float,
        BuiltInType::Double,
        BuiltInType::String,
        BuiltInType::DateTime,
        BuiltInType::Guid,
        BuiltInType::ByteString,
        BuiltInType::XmlElement,
        BuiltInType::NodeId,
        BuiltInType::ExpandedNodeId,
        BuiltInType::StatusCode,
        BuiltInType::QualifiedName,
        BuiltInType::LocalizedText,
        BuiltInType::ExtensionObject,
        BuiltInType::DataValue,
        BuiltInType::Variant,
        BuiltInType::DiagnosticInfo,
        BuiltInType::Number,
        BuiltInType::Integer,
        BuiltInType::UInteger,
        BuiltInType::Enumeration,
    ];

    /// Looks up a built-in type by its numeric id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltInType::Null => "Null",
            BuiltInType::Boolean => "Boolean",
            BuiltInType::SByte => "SByte",
            BuiltInType::Byte => "Byte",
            BuiltInType::Int16 => "Int16",
            BuiltInType::UInt16 => "UInt16",
            BuiltInType::Int32 => "Int32",
            BuiltInType::UInt32 => "UInt32",
            BuiltInType::Int64 => "Int64",
            BuiltInType::UInt64 => "UInt64",
            BuiltInType::Float => "Float",
            BuiltInType::Double => "Double",
            BuiltInType::String => "String",
            BuiltInType::DateTime => "DateTime",
            BuiltInType::Guid => "Guid",
            BuiltInType::ByteString => "ByteString",
            BuiltInType::XmlElement => "XmlElement",
            BuiltInType::NodeId => "NodeId",
            BuiltInType::ExpandedNodeId => "ExpandedNodeId",
            BuiltInType::StatusCode => "StatusCode",
            BuiltInType::QualifiedName => "QualifiedName",
            BuiltInType::LocalizedText => "LocalizedText",
            BuiltInType::ExtensionObject => "ExtensionObject",
            BuiltInType::DataValue => "DataValue",
            BuiltInType::Variant => "Variant",
            BuiltInType::DiagnosticInfo => "DiagnosticInfo",
            BuiltInType::Number => "Number",
            BuiltInType::Integer => "Integer",
            BuiltInType::UInteger => "UInteger",
            BuiltInType::Enumeration => "Enumeration",
        }
    }

    /// Looks up a built-in type by name, as written by compact JSON encoders.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Abstract supertypes that never carry a value of their own.
    pub fn is_abstract(self) -> bool {
        matches!(
            self,
            BuiltInType::Number | BuiltInType::Integer | BuiltInType::UInteger
        )
    }

    /// Types whose JSON form can be `null`.
    pub fn is_nullable_in_json(self) -> bool {
        matches!(
            self,
            BuiltInType::Int64 | BuiltInType::UInt64 | BuiltInType::String
        ) || (BuiltInType::ByteString..=BuiltInType::UInteger).contains(&self)
    }
}

impl fmt::Display for BuiltInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The rank part of a discriminator pair.
///
/// Matrices travel as one-dimensional arrays preceded by their dimension vector,
/// so the discriminator only distinguishes scalars from arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueRank {
    Scalar,
    OneDimension,
}

impl ValueRank {
    /// The OPC UA value rank number (-1 scalar, 1 one dimension).
    pub fn as_i32(self) -> i32 {
        match self {
            ValueRank::Scalar => -1,
            ValueRank::OneDimension => 1,
        }
    }
}
