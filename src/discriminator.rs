//! The variant union discriminator table.
//!
//! Every binary variant carries a union index selecting a `(rank, type)` pair.
//! Encoder, decoder and schema deriver all go through this one table; the index
//! values are part of the wire format.

use crate::builtin::{BuiltInType, ValueRank};
use crate::{EncoderError, Result};

/// Number of entries in the table.
pub const DISCRIMINATOR_COUNT: usize = 58;

use BuiltInType as T;
use ValueRank::{OneDimension as A, Scalar as S};

static TABLE: [(ValueRank, BuiltInType); DISCRIMINATOR_COUNT] = [
    // Scalars: every built-in type except Variant.
    (S, T::Null),
    (S, T::Boolean),
    (S, T::SByte),
    (S, T::Byte),
    (S, T::Int16),
    (S, T::UInt16),
    (S, T::Int32),
    (S, T::UInt32),
    (S, T::Int64),
    (S, T::UInt64),
    (S, T::Float),
    (S, T::Double),
    (S, T::String),
    (S, T::DateTime),
    (S, T::Guid),
    (S, T::ByteString),
    (S, T::XmlElement),
    (S, T::NodeId),
    (S, T::ExpandedNodeId),
    (S, T::StatusCode),
    (S, T::QualifiedName),
    (S, T::LocalizedText),
    (S, T::ExtensionObject),
    (S, T::DataValue),
    (S, T::DiagnosticInfo),
    (S, T::Number),
    (S, T::Integer),
    (S, T::UInteger),
    (S, T::Enumeration),
    // Arrays: every built-in type except Null.
    (A, T::Boolean),
    (A, T::SByte),
    (A, T::Byte),
    (A, T::Int16),
    (A, T::UInt16),
    (A, T::Int32),
    (A, T::UInt32),
    (A, T::Int64),
    (A, T::UInt64),
    (A, T::Float),
    (A, T::Double),
    (A, T::String),
    (A, T::DateTime),
    (A, T::Guid),
    (A, T::ByteString),
    (A, T::XmlElement),
    (A, T::NodeId),
    (A, T::ExpandedNodeId),
    (A, T::StatusCode),
    (A, T::QualifiedName),
    (A, T::LocalizedText),
    (A, T::ExtensionObject),
    (A, T::DataValue),
    (A, T::Variant),
    (A, T::DiagnosticInfo),
    (A, T::Number),
    (A, T::Integer),
    (A, T::UInteger),
    (A, T::Enumeration),
];

/// Index of the null scalar.
pub const NULL_INDEX: u32 = 0;

/// Returns the pair stored at `index`, if any.
pub fn pair_at(index: u32) -> Option<(ValueRank, BuiltInType)> {
    TABLE.get(index as usize).copied()
}

/// Returns the index of a pair, if the table contains it.
pub fn index_of(rank: ValueRank, built_in_type: BuiltInType) -> Option<u32> {
    TABLE
        .iter()
        .position(|&(r, t)| r == rank && t == built_in_type)
        .map(|i| i as u32)
}

/// Like [`index_of`] but fails with an encoding error for pairs that have no index.
pub fn encode_index(rank: ValueRank, built_in_type: BuiltInType) -> Result<u32> {
    index_of(rank, built_in_type).ok_or_else(|| {
        EncoderError::Encoding(format!(
            "Invalid built in type or value rank for variant: {} with rank {}",
            built_in_type,
            rank.as_i32()
        ))
    })
}

/// Like [`pair_at`] but fails with a decoding error for unknown indexes.
pub fn decode_index(index: i64) -> Result<(ValueRank, BuiltInType)> {
    u32::try_from(index)
        .ok()
        .and_then(pair_at)
        .ok_or_else(|| {
            EncoderError::Decoding(format!(
                "Cannot decode unknown variant union field: {}",
                index
            ))
        })
}

/// Iterates over all `(index, rank, type)` entries in wire order.
pub fn entries() -> impl Iterator<Item = (u32, ValueRank, BuiltInType)> {
    TABLE
        .iter()
        .enumerate()
        .map(|(i, &(rank, t))| (i as u32, rank, t))
}
