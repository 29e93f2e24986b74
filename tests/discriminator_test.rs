use bytes::{Bytes, BytesMut};
use opcua_encoder::binary::{zigzag_decode, zigzag_encode};
use opcua_encoder::discriminator::{self, DISCRIMINATOR_COUNT, NULL_INDEX};
use opcua_encoder::{
    decode, encode, Array, BinaryReader, BinaryWriter, BuiltInType, EncodingContext, ErrorKind,
    ValueRank, Variant,
};
use proptest::prelude::*;
use std::collections::HashSet;

#[test]
fn test_table_has_58_distinct_pairs() {
    let entries: Vec<_> = discriminator::entries().collect();
    assert_eq!(entries.len(), DISCRIMINATOR_COUNT);
    let pairs: HashSet<_> = entries.iter().map(|&(_, rank, t)| (rank, t)).collect();
    assert_eq!(pairs.len(), DISCRIMINATOR_COUNT);
    for (expected, (index, _, _)) in entries.iter().enumerate() {
        assert_eq!(*index as usize, expected);
    }
}

#[test]
fn test_index_and_pair_agree_for_every_entry() {
    for (index, rank, built_in_type) in discriminator::entries() {
        assert_eq!(discriminator::pair_at(index), Some((rank, built_in_type)));
        assert_eq!(discriminator::index_of(rank, built_in_type), Some(index));
        assert_eq!(
            discriminator::decode_index(i64::from(index)).unwrap(),
            (rank, built_in_type)
        );
    }
}

#[test]
fn test_well_known_indexes() {
    assert_eq!(NULL_INDEX, 0);
    assert_eq!(discriminator::index_of(ValueRank::Scalar, BuiltInType::UInt64), Some(9));
    assert_eq!(discriminator::index_of(ValueRank::Scalar, BuiltInType::Variant), None);
    assert_eq!(discriminator::index_of(ValueRank::OneDimension, BuiltInType::Null), None);
    assert!(discriminator::index_of(ValueRank::OneDimension, BuiltInType::Variant).is_some());
}

#[test]
fn test_unknown_index_is_a_decoding_error() {
    let err = discriminator::decode_index(DISCRIMINATOR_COUNT as i64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decoding);
    assert!(discriminator::decode_index(-1).is_err());

    let err = discriminator::encode_index(ValueRank::Scalar, BuiltInType::Variant).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encoding);
}

#[test]
fn test_empty_array_of_every_element_type_round_trips() {
    let context = EncodingContext::default();
    for (index, rank, built_in_type) in discriminator::entries() {
        if rank != ValueRank::OneDimension || built_in_type.is_abstract() {
            continue;
        }
        let array = Array::empty(built_in_type).unwrap();
        let value = Variant::Array(array);
        let mut bytes = encode(&value, &context).unwrap();
        assert_eq!(u64::from(bytes[1]), zigzag_encode(i64::from(index)));
        let decoded: Variant = decode(&mut bytes, &context).unwrap();
        assert_eq!(decoded, value, "{}", built_in_type);
    }
}

proptest! {
    #[test]
    fn zigzag_round_trips(value in any::<i64>()) {
        prop_assert_eq!(zigzag_decode(zigzag_encode(value)), value);
    }

    #[test]
    fn zigzag_keeps_small_magnitudes_small(value in -64i64..64) {
        prop_assert!(zigzag_encode(value) < 128);
    }

    #[test]
    fn varint_round_trips(value in any::<i64>()) {
        let context = EncodingContext::default();
        let mut buffer = BytesMut::new();
        let mut writer = BinaryWriter::new(&mut buffer, &context);
        writer.write_long(value);
        prop_assert!(buffer.len() <= 10);
        let mut reader = BinaryReader::new(buffer.freeze(), &context);
        prop_assert_eq!(reader.read_long().unwrap(), value);
        prop_assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn int32_variants_round_trip(value in any::<i32>()) {
        let context = EncodingContext::default();
        let mut bytes = encode(&Variant::Int32(value), &context).unwrap();
        let decoded: Variant = decode(&mut bytes, &context).unwrap();
        prop_assert_eq!(decoded, Variant::Int32(value));
    }
}

#[test]
fn test_overlong_varint_is_rejected() {
    let context = EncodingContext::default();
    let mut reader = BinaryReader::new(Bytes::from_static(&[0xFF; 11]), &context);
    assert_eq!(reader.read_long().unwrap_err().kind(), ErrorKind::Decoding);
}
